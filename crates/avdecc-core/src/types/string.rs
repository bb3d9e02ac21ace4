use core::fmt;
use core::str;

/// The fixed 64-byte UTF-8 name field used by the AEM SET_NAME and GET_NAME
/// commands. Shorter names are NUL-padded on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AvdeccString {
    raw: [u8; Self::LEN],
}

impl AvdeccString {
    pub const LEN: usize = 64;

    pub const fn from_raw(raw: [u8; Self::LEN]) -> Self {
        Self { raw }
    }

    /// Builds a name from a string, truncating at a character boundary if it
    /// exceeds 64 bytes.
    pub fn from_str_lossy(name: &str) -> Self {
        let mut raw = [0u8; Self::LEN];
        let mut end = name.len().min(Self::LEN);
        while end > 0 && !name.is_char_boundary(end) {
            end -= 1;
        }
        raw[..end].copy_from_slice(&name.as_bytes()[..end]);
        Self { raw }
    }

    pub const fn raw(&self) -> &[u8; Self::LEN] {
        &self.raw
    }

    /// The name up to the first NUL, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        let end = self
            .raw
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(Self::LEN);
        str::from_utf8(&self.raw[..end]).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.raw[0] == 0
    }
}

impl Default for AvdeccString {
    fn default() -> Self {
        Self::from_raw([0u8; Self::LEN])
    }
}

impl fmt::Debug for AvdeccString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AvdeccString({:?})", self.as_str().unwrap_or("<invalid>"))
    }
}

impl fmt::Display for AvdeccString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("<invalid utf-8>"))
    }
}

#[cfg(test)]
mod tests {
    use super::AvdeccString;

    #[test]
    fn pads_and_truncates() {
        let s = AvdeccString::from_str_lossy("Output 1");
        assert_eq!(s.as_str(), Some("Output 1"));
        assert_eq!(s.raw()[8], 0);

        let long = "x".repeat(80);
        let t = AvdeccString::from_str_lossy(&long);
        assert_eq!(t.as_str().unwrap().len(), 64);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let name = format!("{}é", "a".repeat(63));
        let s = AvdeccString::from_str_lossy(&name);
        assert_eq!(s.as_str(), Some(&name[..63]));
    }
}
