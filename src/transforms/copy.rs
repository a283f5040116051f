//! Pass-through stage for static assets.

use super::{SourceFile, Transform, TransformError};

/// Copies the file unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Copy;

impl Transform for Copy {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn apply(&self, file: SourceFile) -> Result<Option<SourceFile>, TransformError> {
        Ok(Some(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_keeps_binary_contents() {
        let bytes = vec![0x89, b'P', b'N', b'G', 0x00, 0xff];
        let file = SourceFile::new("src/images/a.png", "a.png", bytes.clone());
        let out = Copy.apply(file).unwrap().unwrap();
        assert_eq!(out.contents, bytes);
    }
}
