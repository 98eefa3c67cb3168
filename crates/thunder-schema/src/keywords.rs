//! SQL keywords offered by autocomplete

#[rustfmt::skip]
const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "AND", "OR", "NOT", "IN", "LIKE", "BETWEEN",
    "IS", "NULL", "TRUE", "FALSE", "AS", "ON", "JOIN", "LEFT", "RIGHT",
    "INNER", "OUTER", "FULL", "CROSS", "ORDER", "BY", "ASC", "DESC",
    "GROUP", "HAVING", "LIMIT", "OFFSET", "UNION", "ALL", "DISTINCT",
    "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE", "CREATE",
    "TABLE", "INDEX", "VIEW", "DROP", "ALTER", "ADD", "COLUMN",
    "PRIMARY", "KEY", "FOREIGN", "REFERENCES", "CONSTRAINT", "DEFAULT",
    "UNIQUE", "CHECK", "CASCADE", "RESTRICT", "TRUNCATE", "BEGIN",
    "COMMIT", "ROLLBACK", "TRANSACTION", "CASE", "WHEN", "THEN", "ELSE",
    "END", "CAST", "COALESCE", "NULLIF", "EXISTS", "COUNT", "SUM",
    "AVG", "MIN", "MAX", "LOWER", "UPPER", "LENGTH", "SUBSTRING",
    "TRIM", "CONCAT", "NOW", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP",
];

/// Keywords for generic SQL autocomplete, in display order
pub fn sql_keywords() -> &'static [&'static str] {
    SQL_KEYWORDS
}
