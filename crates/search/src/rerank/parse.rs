use shopsearch_common::{AppError, Result};

/// Decodes the JSON id array embedded in a free-text reply.
///
/// The array is taken from the first `[` to the last `]`, so prose or code
/// fences around it are tolerated.
pub fn parse_ids(reply: &str) -> Result<Vec<String>> {
    let array = match (reply.find('['), reply.rfind(']')) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => {
            return Err(AppError::AiResponseMalformed {
                message: format!("Reply does not contain a JSON array: {}", reply),
            })
        }
    };

    serde_json::from_str(array).map_err(|e| AppError::AiResponseMalformed {
        message: format!("Failed to parse ranked ids: {}", e),
    })
}
