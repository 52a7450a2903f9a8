//! Fixed-schema row: `id: u32`, `username: [u8; 33]`, `email: [u8; 256]`.
//! Serialized little-endian for `id`, raw bytes for the strings with
//! unused trailing bytes left undefined (not zeroed on every write — only
//! the bytes actually copied from the source string are written).

pub const USERNAME_MAX: usize = 32;
pub const EMAIL_MAX: usize = 255;

pub const ID_SIZE: usize = 4;
pub const USERNAME_SIZE: usize = USERNAME_MAX + 1;
pub const EMAIL_SIZE: usize = EMAIL_MAX + 1;

const ID_OFFSET: usize = 0;
const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    pub fn new(id: u32, username: impl Into<String>, email: impl Into<String>) -> Row {
        Row {
            id,
            username: username.into(),
            email: email.into(),
        }
    }

    /// Writes this row's 293-byte wire representation into `dest`.
    pub fn write_to(&self, dest: &mut [u8; ROW_SIZE]) {
        dest[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        write_string(
            &mut dest[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE],
            &self.username,
        );
        write_string(
            &mut dest[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE],
            &self.email,
        );
    }

    /// Reads a row back out of its 293-byte wire representation.
    pub fn read_from(src: &[u8; ROW_SIZE]) -> Row {
        let id = u32::from_le_bytes(src[ID_OFFSET..ID_OFFSET + ID_SIZE].try_into().unwrap());
        let username = read_string(&src[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]);
        let email = read_string(&src[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]);
        Row { id, username, email }
    }
}

/// `strncpy`-equivalent: copies as many bytes of `s` as fit, does not pad
/// the remainder (trailing bytes are whatever the buffer already held).
fn write_string(dest: &mut [u8], s: &str) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(dest.len().saturating_sub(1));
    dest[..n].copy_from_slice(&bytes[..n]);
    dest[n] = 0;
}

/// Recovers C-string semantics: bytes up to the first NUL, or the whole
/// slice if there isn't one.
fn read_string(src: &[u8]) -> String {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    String::from_utf8_lossy(&src[..end]).into_owned()
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({} {} {})", self.id, self.username, self.email)
    }
}
