//! The only collaborator a client of this crate must implement: the
//! concrete block-addressable backing store. Grounded on
//! `acorn/src/disk/storage.rs`'s `StorageApi` trait.

#[cfg(test)]
use mockall::automock;

/// The backing store the cache controller reads from / writes back to.
///
/// Both operations take an opaque `Meta` handle, forwarded verbatim from the
/// client's `read`/`write` call, for callers that need to thread through
/// e.g. a transaction id or WAL token. Implementations that don't need one
/// should set `type Meta = ();`.
#[cfg_attr(test, automock(type Error = std::io::Error; type Meta = ();))]
pub trait BackingStore {
	type Error: std::error::Error + Send + Sync + 'static;
	type Meta;

	fn read_storage(
		&self,
		address: u64,
		size: usize,
		out: &mut [u8],
		meta: &Self::Meta,
	) -> Result<(), Self::Error>;

	fn write_storage(
		&self,
		address: u64,
		size: usize,
		data: &[u8],
		meta: &Self::Meta,
	) -> Result<(), Self::Error>;
}
