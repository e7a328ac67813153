use crate::contract::{UploadTask, ValidationError};

/// Pairs each image key with its signed URL and stamps the shared batch and
/// split onto every task. Order of `image_keys` is preserved.
pub fn plan_upload_tasks(
    image_keys: Vec<String>,
    signed_urls: Vec<String>,
    batch: &str,
    split: &str,
) -> Result<Vec<UploadTask>, ValidationError> {
    if image_keys.len() != signed_urls.len() {
        return Err(ValidationError::new(format!(
            "Signed URL count {} does not match image count {}",
            signed_urls.len(),
            image_keys.len()
        )));
    }

    if split.trim().is_empty() {
        return Err(ValidationError::new("split cannot be empty"));
    }

    let tasks: Vec<UploadTask> = image_keys
        .into_iter()
        .zip(signed_urls)
        .map(|(image_key, signed_url)| UploadTask {
            image_key,
            signed_url,
            batch: batch.to_string(),
            name: None,
            split: split.to_string(),
        })
        .collect();

    validate_plan(&tasks)?;
    Ok(tasks)
}

fn validate_plan(tasks: &[UploadTask]) -> Result<(), ValidationError> {
    for task in tasks {
        if task.signed_url.is_empty() {
            return Err(ValidationError::new(format!(
                "Image '{}' has no signed URL",
                task.image_key
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::contract::DEFAULT_SPLIT;

    use super::*;

    fn keys(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("NFL/shoot42/frames/{i}.jpg")).collect()
    }

    fn urls(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!("https://bucket.s3.amazonaws.com/{i}.jpg?X-Amz-Expires=3600"))
            .collect()
    }

    #[test]
    fn plans_one_task_per_signed_url() {
        let tasks = plan_upload_tasks(keys(3), urls(3), "batch-shoot42", DEFAULT_SPLIT)
            .expect("plan should pass");

        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|task| task.batch == "batch-shoot42"));
        assert!(tasks.iter().all(|task| task.split == "train"));
        assert!(tasks.iter().all(|task| task.name.is_none()));
        assert_eq!(tasks[2].image_key, "NFL/shoot42/frames/2.jpg");
        assert!(tasks[2].signed_url.contains("/2.jpg"));
    }

    #[test]
    fn plans_nothing_for_empty_listing() {
        let tasks = plan_upload_tasks(Vec::new(), Vec::new(), "batch-shoot42", DEFAULT_SPLIT)
            .expect("plan should pass");
        assert!(tasks.is_empty());
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let error = plan_upload_tasks(keys(2), urls(1), "batch-x", DEFAULT_SPLIT)
            .expect_err("plan should fail");
        assert_eq!(
            error.message(),
            "Signed URL count 1 does not match image count 2"
        );
    }

    #[test]
    fn rejects_empty_signed_url() {
        let error = plan_upload_tasks(keys(1), vec![String::new()], "batch-x", DEFAULT_SPLIT)
            .expect_err("plan should fail");
        assert_eq!(
            error.message(),
            "Image 'NFL/shoot42/frames/0.jpg' has no signed URL"
        );
    }
}
