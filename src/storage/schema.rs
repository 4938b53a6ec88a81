//! Marketplace tables, created idempotently at startup.

pub const CREATE_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        surname TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'USER' CHECK (role IN ('USER', 'ADMIN'))
    )",
    "CREATE TABLE IF NOT EXISTS tags (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS gift_certificates (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        price BIGINT NOT NULL CHECK (price > 0),
        duration INTEGER NOT NULL CHECK (duration > 0),
        create_date TIMESTAMPTZ NOT NULL,
        last_update_date TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS gift_certificate_tags (
        certificate_id BIGINT NOT NULL REFERENCES gift_certificates (id) ON DELETE CASCADE,
        tag_id BIGINT NOT NULL REFERENCES tags (id) ON DELETE CASCADE,
        PRIMARY KEY (certificate_id, tag_id)
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL REFERENCES users (id),
        certificate_id BIGINT NOT NULL REFERENCES gift_certificates (id),
        cost BIGINT NOT NULL CHECK (cost > 0),
        purchase_date TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS orders_user_id_idx ON orders (user_id)",
    "CREATE INDEX IF NOT EXISTS gift_certificate_tags_tag_id_idx ON gift_certificate_tags (tag_id)",
];

/// Application tables, children first; used when wiping data in tests.
pub const TABLES: &[&str] = &[
    "orders",
    "gift_certificate_tags",
    "gift_certificates",
    "tags",
    "users",
];
