//! Reserved words per target dialect
//!
//! The active set for a dialect is the core set (schema keywords, host
//! language keywords, core SQL and the Oracle list) plus the dialect's own
//! list. Matching is case-insensitive.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::config::Dialect;

const SCHEMA_KEYWORDS: &[&str] = &["entity", "field", "form", "menu", "screen", "plugin"];

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "continue", "for", "new", "switch", "assert", "default", "goto", "package",
    "synchronized", "boolean", "do", "if", "private", "this", "break", "double", "implements",
    "protected", "throw", "byte", "else", "import", "public", "throws", "case", "enum",
    "instanceof", "return", "transient", "catch", "extends", "int", "short", "try", "char",
    "final", "interface", "static", "void", "class", "finally", "long", "strictfp", "volatile",
    "const", "float", "native", "super", "while",
];

const JAVASCRIPT_KEYWORDS: &[&str] = &["function"];

const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "FROM", "WHERE", "TABLE", "CREATE", "DROP", "ALTER",
    "INDEX", "GRANT", "REVOKE", "UNION", "JOIN", "ORDER", "GROUP", "BY", "HAVING", "AND", "OR",
    "NOT", "NULL", "VALUES", "INTO", "SET", "PRIMARY", "FOREIGN", "REFERENCES", "CONSTRAINT",
    "UNIQUE", "CHECK", "DISTINCT", "AS", "ON", "IN", "IS", "LIKE", "BETWEEN", "EXISTS", "CASE",
    "WHEN", "THEN", "ELSE",
];

const ORACLE_KEYWORDS: &[&str] = &[
    "ACCESS", "ELSE", "MODIFY", "START", "ADD", "EXCLUSIVE", "NOAUDIT", "SELECT", "ALL", "EXISTS",
    "NOCOMPRESS", "SESSION", "ALTER", "FILE", "NOT", "SET", "AND", "FLOAT", "NOTFOUND", "SHARE",
    "ANY", "FOR", "NOWAIT", "SIZE", "ARRAYLEN", "FROM", "NULL", "SMALLINT", "AS", "GRANT",
    "NUMBER", "SQLBUF", "ASC", "GROUP", "OF", "SUCCESSFUL", "AUDIT", "HAVING", "OFFLINE",
    "SYNONYM", "BETWEEN", "IDENTIFIED", "ON", "SYSDATE", "BY", "IMMEDIATE", "ONLINE", "TABLE",
    "CHAR", "IN", "OPTION", "THEN", "CHECK", "INCREMENT", "OR", "TO", "CLUSTER", "INDEX",
    "ORDER", "TRIGGER", "COLUMN", "INITIAL", "PCTFREE", "UID", "COMMENT", "INSERT", "PRIOR",
    "UNION", "COMPRESS", "INTEGER", "PRIVILEGES", "UNIQUE", "CONNECT", "INTERSECT", "PUBLIC",
    "UPDATE", "CREATE", "INTO", "RAW", "USER", "CURRENT", "IS", "RENAME", "VALIDATE", "DATE",
    "LEVEL", "RESOURCE", "VALUES", "DECIMAL", "LIKE", "REVOKE", "VARCHAR", "DEFAULT", "LOCK",
    "ROW", "VARCHAR2", "DELETE", "LONG", "ROWID", "VIEW", "DESC", "MAXEXTENTS", "ROWLABEL",
    "WHENEVER", "DISTINCT", "MINUS", "ROWNUM", "WHERE", "DROP", "MODE", "ROWS", "WITH",
];

const MYSQL_KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "ANALYZE", "AND", "AS", "ASC", "ASENSITIVE", "BEFORE",
    "BETWEEN", "BIGINT", "BINARY", "BLOB", "BOTH", "BY", "CALL", "CASCADE", "CASE", "CHANGE",
    "CHAR", "CHARACTER", "CHECK", "COLLATE", "COLUMN", "CONDITION", "CONNECTION", "CONSTRAINT",
    "CONTINUE", "CONVERT", "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "CURRENT_USER", "CURSOR", "DATABASE", "DATABASES", "DAY_HOUR",
    "DAY_MICROSECOND", "DAY_MINUTE", "DAY_SECOND", "DEC", "DECIMAL", "DECLARE", "DEFAULT",
    "DELAYED", "DELETE", "DESC", "DESCRIBE", "DETERMINISTIC", "DISTINCT", "DISTINCTROW", "DIV",
    "DOUBLE", "DROP", "DUAL", "EACH", "ELSE", "ELSEIF", "ENCLOSED", "ESCAPED", "EXISTS", "EXIT",
    "EXPLAIN", "FALSE", "FETCH", "FLOAT", "FLOAT4", "FLOAT8", "FOR", "FORCE", "FOREIGN", "FROM",
    "FULLTEXT", "GRANT", "GROUP", "HAVING", "HIGH_PRIORITY", "HOUR_MICROSECOND", "HOUR_MINUTE",
    "HOUR_SECOND", "IF", "IGNORE", "IN", "INDEX", "INFILE", "INNER", "INOUT", "INSENSITIVE",
    "INSERT", "INT", "INT1", "INT2", "INT3", "INT4", "INT8", "INTEGER", "INTERVAL", "INTO", "IS",
    "ITERATE", "JOIN", "KEY", "KEYS", "KILL", "LEADING", "LEAVE", "LEFT", "LIKE", "LIMIT",
    "LINES", "LOAD", "LOCALTIME", "LOCALTIMESTAMP", "LOCK", "LONG", "LONGBLOB", "LONGTEXT",
    "LOOP", "LOW_PRIORITY", "MATCH", "MEDIUMBLOB", "MEDIUMINT", "MEDIUMTEXT", "MIDDLEINT",
    "MINUTE_MICROSECOND", "MINUTE_SECOND", "MOD", "MODIFIES", "NATURAL", "NOT",
    "NO_WRITE_TO_BINLOG", "NULL", "NUMERIC", "ON", "OPTIMIZE", "OPTION", "OPTIONALLY", "OR",
    "ORDER", "OUT", "OUTER", "OUTFILE", "PRECISION", "PRIMARY", "PROCEDURE", "PURGE", "RAID0",
    "READ", "READS", "REAL", "REFERENCES", "REGEXP", "RELEASE", "RENAME", "REPEAT", "REPLACE",
    "REQUIRE", "RESTRICT", "RETURN", "REVOKE", "RIGHT", "RLIKE", "SCHEMA", "SCHEMAS",
    "SECOND_MICROSECOND", "SELECT", "SENSITIVE", "SEPARATOR", "SET", "SHOW", "SMALLINT",
    "SONAME", "SPATIAL", "SPECIFIC", "SQL", "SQLEXCEPTION", "SQLSTATE", "SQLWARNING",
    "SQL_BIG_RESULT", "SQL_CALC_FOUND_ROWS", "SQL_SMALL_RESULT", "SSL", "STARTING",
    "STRAIGHT_JOIN", "TABLE", "TERMINATED", "THEN", "TINYBLOB", "TINYINT", "TINYTEXT", "TO",
    "TRAILING", "TRIGGER", "TRUE", "UNDO", "UNION", "UNIQUE", "UNLOCK", "UNSIGNED", "UPDATE",
    "USAGE", "USE", "USING", "UTC_DATE", "UTC_TIME", "UTC_TIMESTAMP", "VALUES", "VARBINARY",
    "VARCHAR", "VARCHARACTER", "VARYING", "WHEN", "WHERE", "WHILE", "WITH", "WRITE", "X509",
    "XOR", "YEAR_MONTH", "ZEROFILL",
];

const POSTGRESQL_KEYWORDS: &[&str] = &[
    "ALL", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC", "ASYMMETRIC", "BOTH",
    "CASE", "CAST", "CHECK", "COLLATE", "COLUMN", "CONSTRAINT", "CREATE", "CURRENT_CATALOG",
    "CURRENT_DATE", "CURRENT_ROLE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER",
    "DEFAULT", "DEFERRABLE", "DESC", "DISTINCT", "DO", "ELSE", "END", "EXCEPT", "FALSE", "FETCH",
    "FOR", "FOREIGN", "FROM", "GRANT", "GROUP", "HAVING", "IN", "INITIALLY", "INTERSECT", "INTO",
    "LATERAL", "LEADING", "LIMIT", "LOCALTIME", "LOCALTIMESTAMP", "NOT", "NULL", "OFFSET", "ON",
    "ONLY", "OR", "ORDER", "PLACING", "PRIMARY", "REFERENCES", "RETURNING", "SELECT",
    "SESSION_USER", "SOME", "SYMMETRIC", "TABLE", "THEN", "TO", "TRAILING", "TRUE", "UNION",
    "UNIQUE", "USER", "USING", "VARIADIC", "WHEN", "WHERE", "WINDOW", "WITH",
];

const HSQLDB_KEYWORDS: &[&str] = &[
    "ALIAS", "ALTER", "AUTOCOMMIT", "CALL", "CHECKPOINT", "COMMIT", "CONNECT", "CREATE",
    "COLLATION", "COUNT", "DATABASE", "DEFRAG", "DELAY", "DELETE", "DISCONNECT", "DROP", "END",
    "EXPLAIN", "EXTRACT", "GRANT", "IGNORECASE", "INDEX", "INSERT", "INTEGRITY", "LOGSIZE",
    "PASSWORD", "POSITION", "PLAN", "PROPERTY", "READONLY", "REFERENTIAL", "REVOKE", "ROLE",
    "ROLLBACK", "SAVEPOINT", "SCHEMA", "SCRIPT", "SCRIPTFORMAT", "SELECT", "SEQUENCE", "SET",
    "SHUTDOWN", "SOURCE", "TABLE", "TRIGGER", "UPDATE", "USER", "VIEW", "WRITE",
];

fn upper_set(lists: &[&[&str]]) -> HashSet<String> {
    lists
        .iter()
        .flat_map(|list| list.iter())
        .map(|word| word.to_uppercase())
        .collect()
}

static CORE: Lazy<HashSet<String>> = Lazy::new(|| {
    upper_set(&[
        SCHEMA_KEYWORDS,
        JAVA_KEYWORDS,
        JAVASCRIPT_KEYWORDS,
        SQL_KEYWORDS,
        ORACLE_KEYWORDS,
    ])
});
static MYSQL: Lazy<HashSet<String>> = Lazy::new(|| upper_set(&[MYSQL_KEYWORDS]));
static POSTGRESQL: Lazy<HashSet<String>> = Lazy::new(|| upper_set(&[POSTGRESQL_KEYWORDS]));
static HSQLDB: Lazy<HashSet<String>> = Lazy::new(|| upper_set(&[HSQLDB_KEYWORDS]));

fn dialect_words(dialect: Dialect) -> Option<&'static HashSet<String>> {
    match dialect {
        Dialect::Generic | Dialect::Oracle => None,
        Dialect::Mysql => Some(&*MYSQL),
        Dialect::Postgresql => Some(&*POSTGRESQL),
        Dialect::Hsqldb => Some(&*HSQLDB),
    }
}

/// True when `name` is reserved under `dialect`
pub fn is_reserved(name: &str, dialect: Dialect) -> bool {
    let upper = name.to_uppercase();
    CORE.contains(&upper) || dialect_words(dialect).is_some_and(|words| words.contains(&upper))
}

/// The full reserved-word set of a dialect, upper-cased and sorted
pub fn reserved_words(dialect: Dialect) -> Vec<String> {
    let mut words: Vec<String> = CORE
        .iter()
        .chain(dialect_words(dialect).into_iter().flatten())
        .cloned()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    words.sort();
    words
}
