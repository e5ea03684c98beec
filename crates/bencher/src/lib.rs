#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    file: TestFile,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, file: TestFile) -> Self {
        Self { name, group, file }
    }

    pub fn small(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Small, file)
    }

    pub fn large(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Large, file)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    /// Benchmark id in the form `group/name`.
    pub fn id(&self) -> String {
        format!("{}/{}", self.group.as_str(), self.name)
    }
}

/// A wire fixture, either a CGI response as a server would send it or a
/// synthetic request head.
#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content: &'static [u8],
}

impl TestFile {
    pub const fn new(file_name: &'static str, content: &'static [u8]) -> Self {
        Self { file_name, content }
    }

    pub fn content(&self) -> &'static [u8] {
        self.content
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Large,
}

impl TestGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestGroup::Small => "small",
            TestGroup::Large => "large",
        }
    }
}
