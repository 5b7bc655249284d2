use std::sync::Arc;

use thiserror::Error;

/// Stable, integer-tagged error codes, mirroring the original controller's
/// `CacheErrorCode` enum. `Storage` is not part of that original numbering;
/// it's tagged `8` here and documented as such.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
	BufferNotAllocated = 0,
	AddressOffset = 1,
	AllocateBuffer = 2,
	PageCountSize = 3,
	PageOverloaded = 4,
	ParameterName = 5,
	ParameterValue = 6,
	HashLimit = 7,
	Storage = 8,
}

/// Errors raised by a [`crate::PageCacheController`].
///
/// `E` is the backing store's own error type ([`crate::BackingStore::Error`]).
#[derive(Debug, Error)]
pub enum Error<E> {
	#[error("the cache buffer has not been allocated; call setup_pages first")]
	BufferNotAllocated,

	#[error("address {address} is below the configured start page offset {start_page_offset}")]
	AddressOffset {
		address: u64,
		start_page_offset: u64,
	},

	#[error("failed to allocate a cache buffer of {requested_bytes} bytes")]
	AllocateBuffer { requested_bytes: usize },

	#[error("page_count and page_size must both be greater than zero (got page_count={page_count}, page_size={page_size})")]
	PageCountSize { page_count: usize, page_size: usize },

	#[error("page number overflowed while iterating a byte range")]
	PageOverloaded,

	#[error("unknown replacement policy parameter `{0}`")]
	ParameterName(String),

	#[error("invalid value for replacement policy parameter `{name}`: {value}")]
	ParameterValue { name: String, value: f64 },

	#[error("page locator hash table would exceed its configured memory limit")]
	HashLimit,

	#[error("backing store operation failed: {0}")]
	Storage(#[source] Arc<E>),
}

impl<E> Error<E> {
	pub fn code(&self) -> ErrorCode {
		match self {
			Error::BufferNotAllocated => ErrorCode::BufferNotAllocated,
			Error::AddressOffset { .. } => ErrorCode::AddressOffset,
			Error::AllocateBuffer { .. } => ErrorCode::AllocateBuffer,
			Error::PageCountSize { .. } => ErrorCode::PageCountSize,
			Error::PageOverloaded => ErrorCode::PageOverloaded,
			Error::ParameterName(_) => ErrorCode::ParameterName,
			Error::ParameterValue { .. } => ErrorCode::ParameterValue,
			Error::HashLimit => ErrorCode::HashLimit,
			Error::Storage(_) => ErrorCode::Storage,
		}
	}
}

impl<E> Clone for Error<E> {
	fn clone(&self) -> Self {
		match self {
			Error::BufferNotAllocated => Error::BufferNotAllocated,
			Error::AddressOffset {
				address,
				start_page_offset,
			} => Error::AddressOffset {
				address: *address,
				start_page_offset: *start_page_offset,
			},
			Error::AllocateBuffer { requested_bytes } => Error::AllocateBuffer {
				requested_bytes: *requested_bytes,
			},
			Error::PageCountSize {
				page_count,
				page_size,
			} => Error::PageCountSize {
				page_count: *page_count,
				page_size: *page_size,
			},
			Error::PageOverloaded => Error::PageOverloaded,
			Error::ParameterName(name) => Error::ParameterName(name.clone()),
			Error::ParameterValue { name, value } => Error::ParameterValue {
				name: name.clone(),
				value: *value,
			},
			Error::HashLimit => Error::HashLimit,
			Error::Storage(e) => Error::Storage(Arc::clone(e)),
		}
	}
}
