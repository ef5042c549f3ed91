//! API endpoint URL builders

/// Build index endpoint URL for canonical job IDs
pub fn index_url(base_url: &str, job_ids: &[u64]) -> String {
    let jobs = job_ids
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("{}/api/v1/index?jobs={}", base_url.trim_end_matches('/'), jobs)
}
