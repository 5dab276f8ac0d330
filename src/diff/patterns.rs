//! Surface patterns for function-like and type-like declarations
//!
//! Each entry is matched against a whole diff line, `+`/`-` marker included.
//! Matching is heuristic: multi-line signatures, decorators/annotations on
//! their own line and nested definitions are not recognized.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Language family a pattern was written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    CFamily,
    Java,
    Rust,
    Go,
    Swift,
    Kotlin,
    Ruby,
    Php,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::CFamily => "c-family",
            Language::Java => "java",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Ruby => "ruby",
            Language::Php => "php",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    /// Functions, methods, closures bound to a name
    Function,
    /// Classes, structs, enums, traits, interfaces, modules
    Type,
}

/// One row of the pattern table
#[derive(Debug)]
pub struct DeclarationPattern {
    pub language: Language,
    pub kind: DeclarationKind,
    regex: Regex,
    group: usize,
}

impl DeclarationPattern {
    fn compile(language: Language, kind: DeclarationKind, source: &str, group: usize) -> Self {
        Self {
            language,
            kind,
            regex: Regex::new(source).expect("declaration pattern compiles"),
            group,
        }
    }

    /// Captured declaration name, if the line matches
    pub fn capture<'l>(&self, line: &'l str) -> Option<&'l str> {
        self.regex
            .captures(line)
            .and_then(|c| c.get(self.group))
            .map(|m| m.as_str())
    }
}

/// A successful pattern match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration<'l> {
    pub name: &'l str,
    pub language: Language,
    pub kind: DeclarationKind,
}

// Evaluated top to bottom; first accepted capture wins
const FUNCTION_TABLE: &[(Language, &str, usize)] = &[
    (Language::Python, r"^[+-]\s*(?:async\s+)?def\s+(\w+)\s*\(", 1),
    (
        Language::JavaScript,
        r"^[+-]\s*(?:export\s+(?:default\s+)?)?(?:async\s+)?function\*?\s+(\w+)\s*\(",
        1,
    ),
    (
        Language::Php,
        r"^[+-]\s*(?:(?:public|private|protected|static|abstract|final)\s+)+function\s+&?(\w+)\s*\(",
        1,
    ),
    (Language::CFamily, r"^[+-]\s*(\w+)\s*\([^)]*\)\s*\{", 1),
    (
        Language::Java,
        r"^[+-]\s*(?:public|protected|private)(?:\s+(?:static|final|abstract|synchronized|native|default|async|override|virtual))*\s+[\w<>\[\],.?]+\s+(\w+)\s*\(",
        1,
    ),
    (
        Language::Rust,
        r#"^[+-]\s*(?:pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+(\w+)"#,
        1,
    ),
    (Language::Go, r"^[+-]\s*func\s+(?:\([^)]*\)\s*)?(\w+)\s*[(\[]", 1),
    (
        Language::Kotlin,
        r"^[+-]\s*(?:(?:public|private|internal|protected|override|suspend|inline|open|abstract|operator|infix)\s+)*fun\s+(?:<[^>]*>\s*)?(?:\w+\.)?(\w+)\s*\(",
        1,
    ),
    (
        Language::Swift,
        r"^[+-]\s*(?:(?:public|private|internal|fileprivate|open|static|class|override|mutating|final|@\w+)\s+)*func\s+(\w+)",
        1,
    ),
    (Language::Ruby, r"^[+-]\s*def\s+(?:self\.)?(\w+[?!]?)", 1),
    (
        Language::CFamily,
        r"^[+-]\s*(?:(?:static|inline|virtual|extern|const|unsigned|signed|struct)\s+)*[\w:<>]+[\s*&]+(\w+)\s*\([^;]*\)\s*(?:const\s*)?(?:noexcept\s*)?\{\s*$",
        1,
    ),
    (
        Language::JavaScript,
        r"^[+-]\s*(?:export\s+)?(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s+)?(?:\([^)]*\)|\w+)\s*=>",
        1,
    ),
];

const TYPE_TABLE: &[(Language, &str, usize)] = &[
    (Language::Python, r"^[+-]\s*class\s+(\w+)(?:\s*\([^)]*\))?\s*:", 1),
    (Language::CFamily, r"^[+-]\s*class\s+(\w+)\s*\{", 1),
    (Language::Java, r"^[+-]\s*public\s+class\s+(\w+)", 1),
    (
        Language::Java,
        r"^[+-]\s*(?:(?:export|default|abstract|final|sealed|open|data|partial|internal|private|protected|static)\s+)*(?:class|record)\s+(\w+)",
        1,
    ),
    (Language::Go, r"^[+-]\s*type\s+(\w+)\s+(?:struct|interface)\b", 1),
    (
        Language::TypeScript,
        r"^[+-]\s*(?:(?:export|public|private|protected|abstract|declare)\s+)*(?:interface|enum)\s+(\w+)",
        1,
    ),
    (
        Language::Rust,
        r"^[+-]\s*(?:pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?(?:struct|enum|trait|union)\s+(\w+)",
        1,
    ),
    (
        Language::Swift,
        r"^[+-]\s*(?:(?:public|internal|fileprivate|open|final)\s+)*(?:protocol|extension|actor)\s+(\w+)",
        1,
    ),
    (Language::Ruby, r"^[+-]\s*module\s+(\w+)", 1),
];

/// Names that surface patterns capture from control flow, never declarations
const REJECTED_NAMES: &[&str] = &[
    "if", "else", "for", "while", "switch", "catch", "return", "do", "try", "with", "elif",
    "foreach", "sizeof", "typeof", "new", "delete", "throw", "case", "match", "when", "unless",
    "until", "loop", "defer", "go", "select",
];

static FUNCTION_PATTERNS: LazyLock<Vec<DeclarationPattern>> =
    LazyLock::new(|| compile_table(DeclarationKind::Function, FUNCTION_TABLE));

static TYPE_PATTERNS: LazyLock<Vec<DeclarationPattern>> =
    LazyLock::new(|| compile_table(DeclarationKind::Type, TYPE_TABLE));

fn compile_table(
    kind: DeclarationKind,
    table: &[(Language, &str, usize)],
) -> Vec<DeclarationPattern> {
    table
        .iter()
        .map(|(language, source, group)| DeclarationPattern::compile(*language, kind, source, *group))
        .collect()
}

/// Ordered patterns for one declaration kind
pub fn patterns(kind: DeclarationKind) -> &'static [DeclarationPattern] {
    match kind {
        DeclarationKind::Function => FUNCTION_PATTERNS.as_slice(),
        DeclarationKind::Type => TYPE_PATTERNS.as_slice(),
    }
}

pub fn is_rejected_name(name: &str) -> bool {
    REJECTED_NAMES.contains(&name)
}

/// First pattern of `kind` whose capture is an acceptable name
pub fn match_declaration(line: &str, kind: DeclarationKind) -> Option<Declaration<'_>> {
    patterns(kind).iter().find_map(|pattern| {
        pattern
            .capture(line)
            .filter(|name| !is_rejected_name(name))
            .map(|name| Declaration {
                name,
                language: pattern.language,
                kind,
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(line: &str) -> Option<&str> {
        match_declaration(line, DeclarationKind::Function).map(|d| d.name)
    }

    fn type_name(line: &str) -> Option<&str> {
        match_declaration(line, DeclarationKind::Type).map(|d| d.name)
    }

    #[test]
    fn test_tables_compile() {
        assert_eq!(patterns(DeclarationKind::Function).len(), FUNCTION_TABLE.len());
        assert_eq!(patterns(DeclarationKind::Type).len(), TYPE_TABLE.len());
    }

    #[test]
    fn test_python() {
        assert_eq!(function("+def foo():"), Some("foo"));
        assert_eq!(function("-    async def fetch(self, url):"), Some("fetch"));
        assert_eq!(type_name("+class Widget(Base):"), Some("Widget"));
        assert_eq!(type_name("+class Plain:"), Some("Plain"));
    }

    #[test]
    fn test_javascript() {
        assert_eq!(function("+function render(props) {"), Some("render"));
        assert_eq!(function("+export async function load() {"), Some("load"));
        assert_eq!(function("+const handler = async (req, res) => {"), Some("handler"));
        assert_eq!(function("-export const id = x => x;"), Some("id"));
    }

    #[test]
    fn test_c_family_and_java() {
        assert_eq!(function("+main() {"), Some("main"));
        assert_eq!(function("+int main(int argc, char **argv) {"), Some("main"));
        assert_eq!(function("+static const char *name_of(int id) {"), Some("name_of"));
        assert_eq!(
            function("+    public static void main(String[] args) {"),
            Some("main")
        );
        assert_eq!(function("-  private int count(List<String> xs)"), Some("count"));
        assert_eq!(type_name("+class Node {"), Some("Node"));
        assert_eq!(type_name("+public class Service extends Base"), Some("Service"));
        assert_eq!(type_name("+export default class App extends Component {"), Some("App"));
    }

    #[test]
    fn test_rust() {
        assert_eq!(function("+fn main() {"), Some("main"));
        assert_eq!(function("+    pub(crate) async fn run(&self) -> Result<()> {"), Some("run"));
        assert_eq!(function("-pub unsafe extern \"C\" fn ffi_entry()"), Some("ffi_entry"));
        assert_eq!(type_name("+pub struct Config {"), Some("Config"));
        assert_eq!(type_name("+pub(crate) enum State {"), Some("State"));
        assert_eq!(type_name("+unsafe trait Raw {"), Some("Raw"));
    }

    #[test]
    fn test_go() {
        assert_eq!(function("+func main() {"), Some("main"));
        assert_eq!(function("+func (s *Server) Serve(l net.Listener) error {"), Some("Serve"));
        assert_eq!(function("+func Map[T any](xs []T) []T {"), Some("Map"));
        assert_eq!(type_name("+type Server struct {"), Some("Server"));
        assert_eq!(type_name("+type Reader interface {"), Some("Reader"));
    }

    #[test]
    fn test_other_languages() {
        assert_eq!(function("+  override fun onCreate(state: Bundle?) {"), Some("onCreate"));
        assert_eq!(function("+    public func viewDidLoad<T>() {"), Some("viewDidLoad"));
        assert_eq!(function("+  def self.build"), Some("build"));
        assert_eq!(function("+  def valid?"), Some("valid?"));
        assert_eq!(function("+    public function handle(Request $r) {"), Some("handle"));
        assert_eq!(type_name("+module Billing"), Some("Billing"));
        assert_eq!(type_name("+export interface Props {"), Some("Props"));
        assert_eq!(type_name("+protocol Drawable {"), Some("Drawable"));
    }

    #[test]
    fn test_php_modifiers_tagged_php() {
        let decl = match_declaration("+    public function handle() {", DeclarationKind::Function)
            .unwrap();
        assert_eq!(decl.language, Language::Php);
    }

    #[test]
    fn test_control_flow_is_not_a_declaration() {
        assert_eq!(function("+    if (ready) {"), None);
        assert_eq!(function("+    while (x < 10) {"), None);
        assert_eq!(function("+    } else if (y) {"), None);
        assert_eq!(function("+    switch (kind) {"), None);
        assert_eq!(function("+    return compute(x);"), None);
        assert_eq!(function("+    foo(bar);"), None);
    }

    #[test]
    fn test_rejected_name_falls_through_to_later_patterns() {
        // The bare C-style pattern captures `for`, which is rejected
        assert_eq!(function("+for (i = 0; i < n; i++) {"), None);
        assert!(is_rejected_name("for"));
        assert!(!is_rejected_name("format"));
    }

    #[test]
    fn test_requires_diff_marker() {
        assert_eq!(function("def foo():"), None);
        assert_eq!(function(" def foo():"), None);
        assert_eq!(type_name(" class Foo:"), None);
    }

    #[test]
    fn test_function_and_type_lists_are_independent() {
        let line = "+class Foo { bar() {} }";
        assert_eq!(type_name(line), Some("Foo"));
    }
}
