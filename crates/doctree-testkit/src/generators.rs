//! Proptest generators for property-based testing.

use proptest::prelude::*;

use doctree_core::DocumentId;

use crate::fixtures::MemoryTreeFixture;

/// Generate a file or directory name.
pub fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,15}".prop_map(String::from)
}

/// Generate a file extension, sometimes none.
pub fn extension() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![
        Just(None),
        Just(Some("txt")),
        Just(Some("jpg")),
        Just(Some("mp4")),
        Just(Some("pdf")),
        Just(Some("zzz")),
    ]
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// The immediate contents of one directory: files with payloads, plus
/// sub-directories that each hold one file of their own.
#[derive(Debug, Clone)]
pub struct TreeShape {
    pub files: Vec<(String, Vec<u8>)>,
    pub directories: Vec<String>,
}

impl TreeShape {
    /// Populate the fixture's tree root with this shape.
    ///
    /// Names are made unique by prefixing their position.
    pub fn apply(&self, fixture: &MemoryTreeFixture) -> Vec<DocumentId> {
        let mut ids = Vec::with_capacity(self.files.len());
        for (i, (name, content)) in self.files.iter().enumerate() {
            ids.push(fixture.add_file(&format!("f{}-{}", i, name), content.clone()));
        }
        for (i, name) in self.directories.iter().enumerate() {
            let dir = fixture.add_directory(&format!("d{}-{}", i, name));
            fixture.add_file_in(&dir, "inner.bin", vec![0u8; 4]);
        }
        ids
    }
}

fn file() -> impl Strategy<Value = (String, Vec<u8>)> {
    (name(), extension(), payload(256)).prop_map(|(name, ext, content)| match ext {
        Some(ext) => (format!("{}.{}", name, ext), content),
        None => (name, content),
    })
}

/// Generate a tree shape with up to `max_files` files and `max_dirs` directories.
pub fn tree_shape(max_files: usize, max_dirs: usize) -> impl Strategy<Value = TreeShape> {
    (
        prop::collection::vec(file(), 0..=max_files),
        prop::collection::vec(name(), 0..=max_dirs),
    )
        .prop_map(|(files, directories)| TreeShape { files, directories })
}

impl Arbitrary for TreeShape {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        tree_shape(16, 4).boxed()
    }
}
