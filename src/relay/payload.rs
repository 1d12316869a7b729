//! Checks applied to inbound query bodies before they are forwarded.
//!
//! The body is opaque to the relay; it is only required to be readable text of bounded
//! size, so a malformed request never costs an identity exchange or a provider call.

// self
use crate::{_prelude::*, relay::error::ApiError};

/// Reasons a query body is refused at the boundary.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum QueryRejection {
	/// Body exceeds the configured limit.
	#[error("Query body is {len} bytes; the limit is {limit} bytes.")]
	TooLarge {
		/// Received size.
		len: usize,
		/// Configured limit.
		limit: usize,
	},
	/// Body is not UTF-8 text.
	#[error("Query body must be UTF-8 text.")]
	NotUtf8,
	/// Body is empty or whitespace.
	#[error("Query body must not be empty.")]
	Blank,
	/// Body contains a control character other than tab, CR, or LF.
	#[error("Query body contains a control character at byte {offset}.")]
	ControlCharacter {
		/// Byte offset of the offending character.
		offset: usize,
	},
}
impl From<QueryRejection> for ApiError {
	fn from(rejection: QueryRejection) -> Self {
		match rejection {
			QueryRejection::TooLarge { .. } => ApiError::payload_too_large(rejection.to_string()),
			_ => ApiError::bad_request(rejection.to_string()),
		}
	}
}

/// Validates `raw` against `limit` and returns it as text.
pub fn validate_query(raw: &[u8], limit: usize) -> Result<&str, QueryRejection> {
	if raw.len() > limit {
		return Err(QueryRejection::TooLarge { len: raw.len(), limit });
	}

	let text = std::str::from_utf8(raw).map_err(|_| QueryRejection::NotUtf8)?;

	if text.trim().is_empty() {
		return Err(QueryRejection::Blank);
	}
	if let Some((offset, _)) =
		text.char_indices().find(|(_, c)| c.is_control() && !matches!(c, '\t' | '\r' | '\n'))
	{
		return Err(QueryRejection::ControlCharacter { offset });
	}

	Ok(text)
}
