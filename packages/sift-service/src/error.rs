pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Store error: {message}")]
	Store { message: String },
}

/// Errors raised by a store connector. Timeouts are fatal to the process
/// (never retried, never masked); rejections become synthetic error rows;
/// transport failures surface as `ServiceError::Store`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("Store timed out: {message}")]
	Timeout { message: String },
	#[error("Store rejected the query: {message}")]
	Rejected { message: String },
	#[error("Store transport failure: {message}")]
	Transport { message: String },
}
