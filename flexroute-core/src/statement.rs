//! Write/read classification of statement text.
//!
//! Only the leading keyword is inspected. Anything that does not start with
//! one of [`WRITE_KEYWORDS`] is a read as far as probe cadence is concerned.

/// Leading keywords that mark a statement as a write.
pub const WRITE_KEYWORDS: [&str; 5] = ["INSERT", "UPDATE", "DELETE", "ALTER", "CHANGE"];

/// Coarse statement kind used to decide probe timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Anything not recognised as a write
    Read,
    /// Starts with a write keyword
    Write,
}

impl StatementKind {
    /// Classify `sql` by its first word.
    ///
    /// Leading whitespace is skipped and case is ignored; the keyword must be
    /// a whole word, so `UPDATED_AT` is not a write.
    pub fn classify(sql: &str) -> Self {
        let keyword = sql
            .trim_start()
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .next()
            .unwrap_or_default();

        if WRITE_KEYWORDS
            .iter()
            .any(|write| keyword.eq_ignore_ascii_case(write))
        {
            Self::Write
        } else {
            Self::Read
        }
    }

    /// Whether this is a write.
    pub fn is_write(self) -> bool {
        self == Self::Write
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_write_keywords() {
        for sql in [
            "INSERT INTO t VALUES (1)",
            "UPDATE t SET a = 1",
            "DELETE FROM t",
            "ALTER TABLE t ADD COLUMN b INT",
            "CHANGE MASTER TO MASTER_HOST='b'",
        ] {
            assert_eq!(StatementKind::classify(sql), StatementKind::Write, "{sql}");
        }
    }

    #[test]
    fn test_reads() {
        for sql in ["SELECT 1", "SHOW TABLES", "BEGIN", "", "   ", "-- UPDATE t"] {
            assert_eq!(StatementKind::classify(sql), StatementKind::Read, "{sql:?}");
        }
    }

    #[test]
    fn test_whitespace_and_case() {
        assert!(StatementKind::classify("\n  update t set a = 1").is_write());
        assert!(StatementKind::classify("Delete\tFROM t").is_write());
        assert!(StatementKind::classify("INSERT(a) VALUES (1)").is_write());
    }

    #[test]
    fn test_keyword_must_be_whole_word() {
        assert!(!StatementKind::classify("UPDATED_AT").is_write());
        assert!(!StatementKind::classify("INSERTS").is_write());
    }

    proptest! {
        #[test]
        fn prop_write_keyword_prefix_is_write(
            index in 0..WRITE_KEYWORDS.len(),
            pad in "[ \t\n]{0,4}",
            rest in "[ (][a-zA-Z0-9 ,=()]{0,32}",
        ) {
            let sql = format!("{pad}{}{rest}", WRITE_KEYWORDS[index].to_ascii_lowercase());
            prop_assert!(StatementKind::classify(&sql).is_write());
        }

        #[test]
        fn prop_select_is_read(rest in "[a-zA-Z0-9 ,=*()]{0,32}") {
            let sql = format!("SELECT {rest}");
            prop_assert_eq!(StatementKind::classify(&sql), StatementKind::Read);
        }
    }
}
