use std::fmt;

/// Error codes for every diagnostic the front end reports.
///
/// Format: E#### where the first digit names the phase:
/// - E0xxx: lexer
/// - E1xxx: parser
/// - E2xxx: type checker
/// - E3xxx: package loading
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Lexer Errors (E0xxx)
    /// Unterminated string or raw string literal
    E0001,
    /// Invalid character in source
    E0002,
    /// Invalid number literal
    E0003,
    /// Invalid rune literal
    E0004,
    /// Invalid escape sequence
    E0005,
    /// Unterminated block comment
    E0006,

    // Parser Errors (E1xxx)
    /// Unexpected token
    E1001,
    /// Expected expression
    E1002,
    /// Expected identifier
    E1003,
    /// Expected type
    E1004,
    /// Construct outside the accepted Go subset
    E1005,
    /// Misplaced import declaration
    E1006,

    // Type Errors (E2xxx)
    /// Value not assignable to the required type
    E2001,
    /// Undefined name
    E2002,
    /// Declared and not used
    E2003,
    /// Imported and not used
    E2004,
    /// No new variables on left side of `:=`
    E2005,
    /// Missing return
    E2006,
    /// Invalid operation
    E2007,
    /// Wrong argument count
    E2008,
    /// Name redeclared in this block
    E2009,
    /// Reference to an unexported name
    E2010,
    /// Invalid `main` or `init` declaration
    E2011,
    /// Name is not a type, or a type used as a value
    E2012,
    /// Constant overflow or constant division by zero
    E2013,
    /// Assignment count mismatch
    E2014,
    /// `break` or `continue` outside a loop
    E2015,
    /// Cannot assign to operand
    E2016,
    /// Invalid conversion
    E2017,
    /// Invalid type assertion
    E2018,
    /// Multi-value expression in single-value context
    E2019,

    // Load Errors (E3xxx)
    /// Package not found
    E3001,
    /// Import cycle
    E3002,
    /// Files of different packages in one directory
    E3003,
}

impl ErrorCode {
    /// Get the numeric code as a string (e.g., "E2003").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Lexer
            ErrorCode::E0001 => "E0001",
            ErrorCode::E0002 => "E0002",
            ErrorCode::E0003 => "E0003",
            ErrorCode::E0004 => "E0004",
            ErrorCode::E0005 => "E0005",
            ErrorCode::E0006 => "E0006",
            // Parser
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
            ErrorCode::E1005 => "E1005",
            ErrorCode::E1006 => "E1006",
            // Type
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E2005 => "E2005",
            ErrorCode::E2006 => "E2006",
            ErrorCode::E2007 => "E2007",
            ErrorCode::E2008 => "E2008",
            ErrorCode::E2009 => "E2009",
            ErrorCode::E2010 => "E2010",
            ErrorCode::E2011 => "E2011",
            ErrorCode::E2012 => "E2012",
            ErrorCode::E2013 => "E2013",
            ErrorCode::E2014 => "E2014",
            ErrorCode::E2015 => "E2015",
            ErrorCode::E2016 => "E2016",
            ErrorCode::E2017 => "E2017",
            ErrorCode::E2018 => "E2018",
            ErrorCode::E2019 => "E2019",
            // Load
            ErrorCode::E3001 => "E3001",
            ErrorCode::E3002 => "E3002",
            ErrorCode::E3003 => "E3003",
        }
    }

    /// Check if this is a lexer error (E0xxx range).
    pub fn is_lexer_error(&self) -> bool {
        self.as_str().starts_with("E0")
    }

    /// Check if this is a parser/syntax error (E1xxx range).
    pub fn is_parser_error(&self) -> bool {
        self.as_str().starts_with("E1")
    }

    /// Syntax errors come from either the lexer or the parser.
    pub fn is_syntax_error(&self) -> bool {
        self.is_lexer_error() || self.is_parser_error()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
