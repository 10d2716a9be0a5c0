use md5::{Digest, Md5};

/// Derive an item GUID from its absolute link.
///
/// The GUID is the lowercase hex MD5 digest of the link string. It is a pure
/// function of the link, so regenerating a feed never changes the identity of
/// an entry that readers have already seen.
pub fn guid_for_link(link: &str) -> String {
    let digest = Md5::digest(link.as_bytes());
    format!("{:x}", digest)
}
