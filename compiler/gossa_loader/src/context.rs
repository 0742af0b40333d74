//! Build environment and file selection.

use std::path::PathBuf;

use gossa_types::Sizes;

/// Operating systems recognised in file-name suffixes and build tags.
const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

/// Systems that satisfy the `unix` tag.
const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

/// Where packages live and which files belong to the build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildContext {
    /// Packages are looked up in `<root>/src/<path>`.
    pub root: PathBuf,
    pub goos: String,
    pub goarch: String,
    /// Further roots, searched in order after `root`.
    pub search_paths: Vec<PathBuf>,
}

impl BuildContext {
    /// A context for `linux`/`amd64`, whatever the host is.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        BuildContext {
            root: root.into(),
            goos: "linux".to_string(),
            goarch: "amd64".to_string(),
            search_paths: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_target(mut self, goos: impl Into<String>, goarch: impl Into<String>) -> Self {
        self.goos = goos.into();
        self.goarch = goarch.into();
        self
    }

    /// Machine sizes of the target architecture.
    pub fn sizes(&self) -> Sizes {
        Sizes::for_arch(&self.goarch)
    }

    /// Directories that may hold the package `path`, in search order.
    pub fn candidate_dirs(&self, path: &str) -> Vec<PathBuf> {
        std::iter::once(&self.root)
            .chain(&self.search_paths)
            .map(|root| root.join("src").join(path))
            .collect()
    }

    /// Whether a build tag holds for this context.
    pub fn matches_tag(&self, tag: &str) -> bool {
        tag == self.goos
            || tag == self.goarch
            || tag == "gc"
            || (tag == "unix" && UNIX_OS.contains(&self.goos.as_str()))
            || (tag == "linux" && self.goos == "android")
            || (tag == "solaris" && self.goos == "illumos")
            || (tag == "darwin" && self.goos == "ios")
    }

    /// Whether a file of a package directory takes part in the build, judged
    /// by its name and its `//go:build` line.
    pub fn match_file(&self, name: &str, source: &str) -> bool {
        if !name.ends_with(".go") || name.starts_with('_') || name.starts_with('.') {
            return false;
        }
        if !self.good_os_arch_file(name) {
            return false;
        }
        match build_line(source) {
            None => true,
            Some(expr) => match Constraint::parse(expr) {
                Some(constraint) => constraint.eval(&|tag| self.matches_tag(tag)),
                None => {
                    tracing::warn!(file = name, line = expr, "malformed //go:build line");
                    false
                }
            },
        }
    }

    /// `_test` files never build; `_GOOS`, `_GOARCH` and `_GOOS_GOARCH`
    /// suffixes must match the context.
    fn good_os_arch_file(&self, name: &str) -> bool {
        let stem = name.split('.').next().unwrap_or(name);
        let Some(underscore) = stem.find('_') else {
            return true;
        };
        let mut parts: Vec<&str> = stem[underscore..].split('_').collect();
        if parts.last() == Some(&"test") {
            return false;
        }
        let n = parts.len();
        if n >= 2 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
            return self.matches_tag(parts[n - 2]) && self.matches_tag(parts[n - 1]);
        }
        match parts.pop() {
            Some(last) if KNOWN_OS.contains(&last) || KNOWN_ARCH.contains(&last) => {
                self.matches_tag(last)
            }
            _ => true,
        }
    }
}

/// The expression of the `//go:build` line in a file header, if any. Only
/// comments and blank lines may precede it.
fn build_line(source: &str) -> Option<&str> {
    let mut in_block = false;
    for line in source.lines() {
        let line = line.trim();
        if in_block {
            if let Some(end) = line.find("*/") {
                in_block = false;
                if !line[end + 2..].trim().is_empty() {
                    return None;
                }
            }
            continue;
        }
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("//go:build") {
            if rest.is_empty() || rest.starts_with([' ', '\t']) {
                return Some(rest.trim());
            }
            continue;
        }
        if line.starts_with("//") {
            continue;
        }
        if line.starts_with("/*") {
            in_block = !line.contains("*/");
            continue;
        }
        return None;
    }
    None
}

/// A parsed `//go:build` expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constraint {
    Tag(String),
    Not(Box<Constraint>),
    And(Box<Constraint>, Box<Constraint>),
    Or(Box<Constraint>, Box<Constraint>),
}

impl Constraint {
    /// Parse `tag`, `!x`, `x && y`, `x || y` and parentheses. Returns `None`
    /// for malformed input.
    pub fn parse(text: &str) -> Option<Constraint> {
        let tokens = tokenize(text)?;
        let mut parser = ConstraintParser { tokens, pos: 0 };
        let expr = parser.or()?;
        (parser.pos == parser.tokens.len()).then_some(expr)
    }

    pub fn eval(&self, holds: &dyn Fn(&str) -> bool) -> bool {
        match self {
            Constraint::Tag(tag) => holds(tag),
            Constraint::Not(inner) => !inner.eval(holds),
            Constraint::And(a, b) => a.eval(holds) && b.eval(holds),
            Constraint::Or(a, b) => a.eval(holds) || b.eval(holds),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum ConstraintToken {
    Tag(String),
    Not,
    And,
    Or,
    LParen,
    RParen,
}

fn tokenize(text: &str) -> Option<Vec<ConstraintToken>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            ' ' | '\t' => {}
            '!' => tokens.push(ConstraintToken::Not),
            '(' => tokens.push(ConstraintToken::LParen),
            ')' => tokens.push(ConstraintToken::RParen),
            '&' if chars.next_if(|&(_, c)| c == '&').is_some() => tokens.push(ConstraintToken::And),
            '|' if chars.next_if(|&(_, c)| c == '|').is_some() => tokens.push(ConstraintToken::Or),
            c if c.is_alphanumeric() || c == '_' || c == '.' => {
                let mut end = i + c.len_utf8();
                while let Some((j, d)) =
                    chars.next_if(|&(_, d)| d.is_alphanumeric() || d == '_' || d == '.')
                {
                    end = j + d.len_utf8();
                }
                tokens.push(ConstraintToken::Tag(text[i..end].to_string()));
            }
            _ => return None,
        }
    }
    Some(tokens)
}

struct ConstraintParser {
    tokens: Vec<ConstraintToken>,
    pos: usize,
}

impl ConstraintParser {
    fn eat(&mut self, token: &ConstraintToken) -> bool {
        if self.tokens.get(self.pos) == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Option<Constraint> {
        let mut left = self.and()?;
        while self.eat(&ConstraintToken::Or) {
            let right = self.and()?;
            left = Constraint::Or(Box::new(left), Box::new(right));
        }
        Some(left)
    }

    fn and(&mut self) -> Option<Constraint> {
        let mut left = self.unary()?;
        while self.eat(&ConstraintToken::And) {
            let right = self.unary()?;
            left = Constraint::And(Box::new(left), Box::new(right));
        }
        Some(left)
    }

    fn unary(&mut self) -> Option<Constraint> {
        if self.eat(&ConstraintToken::Not) {
            return Some(Constraint::Not(Box::new(self.unary()?)));
        }
        if self.eat(&ConstraintToken::LParen) {
            let inner = self.or()?;
            return self.eat(&ConstraintToken::RParen).then_some(inner);
        }
        match self.tokens.get(self.pos) {
            Some(ConstraintToken::Tag(tag)) => {
                let tag = tag.clone();
                self.pos += 1;
                Some(Constraint::Tag(tag))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
