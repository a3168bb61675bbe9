use std::fmt;

/// Closed set of diagnostic codes. Every diagnostic the compiler reports
/// carries exactly one of these; the driver exit status is derived from
/// whether any were collected during the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    UndefinedVariable,
    UndefinedFunction,
    DuplicateDefinition,
    InvalidAssignmentTarget,
    InvalidOperationForType,
    TypeMismatch,
    NotAStruct,
    UnknownStructField,
    InvalidFloatLiteral,
    MissingQuote,
    InvalidExpression,
    UnexpectedToken,
    InternalParserError,
    InternalCodeGeneratorError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UndefinedVariable => "UNDEFINED_VARIABLE",
            ErrorCode::UndefinedFunction => "UNDEFINED_FUNCTION",
            ErrorCode::DuplicateDefinition => "DUPLICATE_DEFINITION",
            ErrorCode::InvalidAssignmentTarget => "INVALID_ASSIGNMENT_TARGET",
            ErrorCode::InvalidOperationForType => "INVALID_OPERATION_FOR_TYPE",
            ErrorCode::TypeMismatch => "TYPE_MISMATCH",
            ErrorCode::NotAStruct => "NOT_A_STRUCT",
            ErrorCode::UnknownStructField => "UNKNOWN_STRUCT_FIELD",
            ErrorCode::InvalidFloatLiteral => "INVALID_FLOAT_LITERAL",
            ErrorCode::MissingQuote => "MISSING_QUOTE",
            ErrorCode::InvalidExpression => "INVALID_EXPRESSION",
            ErrorCode::UnexpectedToken => "UNEXPECTED_TOKEN",
            ErrorCode::InternalParserError => "INTERNAL_PARSER_ERROR",
            ErrorCode::InternalCodeGeneratorError => "INTERNAL_CODE_GENERATOR_ERROR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub line_content: String,
}

impl SourceLocation {
    pub fn new(file: &str, line: usize, column: usize, line_content: &str) -> Self {
        SourceLocation {
            file: file.to_string(),
            line,
            column,
            line_content: line_content.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompileError {
    pub code: ErrorCode,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub suggestion: Option<String>,
}

impl CompileError {
    pub fn new(code: ErrorCode, message: &str) -> Self {
        CompileError {
            code,
            message: message.to_string(),
            location: None,
            suggestion: None,
        }
    }

    pub fn with_location(mut self, loc: SourceLocation) -> Self {
        self.location = Some(loc);
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RED: &str = "\x1b[1;31m";
        const BLUE: &str = "\x1b[1;34m";
        const YELLOW: &str = "\x1b[1;33m";
        const GREEN: &str = "\x1b[1;32m";
        const RESET: &str = "\x1b[0m";
        const BOLD: &str = "\x1b[1m";

        writeln!(
            f,
            "{}error[{}]{}: {}{}{}",
            RED,
            self.code.as_str(),
            RESET,
            BOLD,
            self.message,
            RESET
        )?;

        if let Some(ref loc) = self.location {
            writeln!(f, "  {}-->{} {}:{}:{}", BLUE, RESET, loc.file, loc.line, loc.column)?;

            let line_num_width = loc.line.to_string().len();
            writeln!(f, "  {:width$} {}|{}", "", BLUE, RESET, width = line_num_width)?;
            writeln!(
                f,
                "  {}{}{} {}|{} {}",
                BLUE,
                loc.line,
                RESET,
                BLUE,
                RESET,
                loc.line_content.trim_end()
            )?;

            let pointer_offset = loc.column.saturating_sub(1);
            writeln!(
                f,
                "  {:width$} {}|{} {}{}^--- here{}",
                "",
                BLUE,
                RESET,
                " ".repeat(pointer_offset),
                RED,
                RESET,
                width = line_num_width
            )?;
        }

        if let Some(ref suggestion) = self.suggestion {
            writeln!(
                f,
                "  {}help{}: did you mean `{}{}{}`?",
                GREEN, RESET, YELLOW, suggestion, RESET
            )?;
        }

        Ok(())
    }
}

pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut dp = vec![vec![0usize; n + 1]; m + 1];

    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=n {
        dp[0][j] = j;
    }

    for i in 1..=m {
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }

    dp[m][n]
}

/// Find the closest declared name to a misspelled identifier. Very short
/// names (1-2 chars) are skipped; those are usually intentional.
pub fn find_similar_name<'a, I>(word: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    if word.len() <= 2 {
        return None;
    }

    let mut best_match: Option<(String, usize)> = None;

    for candidate in candidates {
        let len_diff = (word.len() as isize - candidate.len() as isize).unsigned_abs();
        if len_diff > 2 {
            continue;
        }

        let distance = levenshtein_distance(word, candidate);
        if distance == 0 {
            return None;
        }

        let max_distance = if word.len() >= 4 { 2 } else { 1 };
        if distance <= max_distance {
            match &best_match {
                Some((_, best)) if distance >= *best => {}
                _ => best_match = Some((candidate.to_string(), distance)),
            }
        }
    }

    best_match.map(|(s, _)| s)
}

/// Source buffer wrapper used to attach line content to diagnostics.
pub struct SourceFile {
    pub filename: String,
    pub content: String,
    lines: Vec<String>,
}

impl SourceFile {
    pub fn new(filename: &str, content: &str) -> Self {
        let lines: Vec<String> = content.lines().map(|s| s.to_string()).collect();
        SourceFile {
            filename: filename.to_string(),
            content: content.to_string(),
            lines,
        }
    }

    pub fn get_line(&self, line_num: usize) -> Option<&str> {
        if line_num > 0 && line_num <= self.lines.len() {
            Some(&self.lines[line_num - 1])
        } else {
            None
        }
    }

    pub fn make_location(&self, line: usize, column: usize) -> SourceLocation {
        let line_content = self.get_line(line).unwrap_or("").to_string();
        SourceLocation::new(&self.filename, line, column, &line_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("count", "count"), 0);
        assert_eq!(levenshtein_distance("count", "cuont"), 2);
        assert_eq!(levenshtein_distance("total", "totl"), 1);
    }

    #[test]
    fn test_find_similar() {
        let names = ["total", "count", "result"];
        assert_eq!(
            find_similar_name("totl", names.iter().copied()),
            Some("total".to_string())
        );
        assert_eq!(
            find_similar_name("resalt", names.iter().copied()),
            Some("result".to_string())
        );
        assert_eq!(find_similar_name("x", names.iter().copied()), None);
    }

    #[test]
    fn test_error_display_carries_code_and_location() {
        let src = SourceFile::new("demo.mc", "int x = y;\n");
        let err = CompileError::new(ErrorCode::UndefinedVariable, "undefined variable 'y'")
            .with_location(src.make_location(1, 9));
        let rendered = format!("{}", err);
        assert!(rendered.contains("UNDEFINED_VARIABLE"));
        assert!(rendered.contains("demo.mc:1:9"));
        assert!(rendered.contains("int x = y;"));
    }
}
