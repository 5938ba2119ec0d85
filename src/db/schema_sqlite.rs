// The `timestamp` column is declared `datetime` in DDL; SQLite stores the
// RFC 3339 text we write into it.

diesel::table! {
    seen (id) {
        id -> BigInt,
        url -> Text,
        nick -> Nullable<Text>,
        src -> Text,
        dst -> Text,
        timestamp -> Text,
    }
}
