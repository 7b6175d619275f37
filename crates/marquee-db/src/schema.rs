//! SQL schema definitions.

/// Complete schema for Marquee v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Content catalog
-- ============================================================

CREATE TABLE IF NOT EXISTS movies (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    filmmaker TEXT,
    sale_price INTEGER CHECK (sale_price IS NULL OR sale_price >= 0),
    watch_party_price INTEGER CHECK (watch_party_price IS NULL OR watch_party_price >= 0),
    created_at INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_movies_filmmaker ON movies(filmmaker);

CREATE TABLE IF NOT EXISTS festival_blocks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    price INTEGER CHECK (price IS NULL OR price >= 0),
    film_ids TEXT NOT NULL DEFAULT '[]'
);

-- ============================================================
-- Promo codes
-- ============================================================

CREATE TABLE IF NOT EXISTS promo_codes (
    code TEXT PRIMARY KEY COLLATE NOCASE,
    promo_type TEXT NOT NULL CHECK (promo_type IN ('one_time_access', 'discount')),
    discount_value INTEGER,
    max_uses INTEGER NOT NULL CHECK (max_uses >= 0),
    used_count INTEGER NOT NULL DEFAULT 0 CHECK (used_count >= 0),
    created_at INTEGER NOT NULL DEFAULT 0,
    CHECK (used_count <= max_uses)
);

-- ============================================================
-- Payout history (append-only)
-- ============================================================

CREATE TABLE IF NOT EXISTS payout_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient TEXT NOT NULL,
    amount INTEGER NOT NULL CHECK (amount >= 0),
    timestamp INTEGER NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('pending', 'completed', 'failed'))
);

CREATE INDEX IF NOT EXISTS idx_payouts_recipient ON payout_records(recipient, status);

-- ============================================================
-- Users
-- ============================================================

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

-- ============================================================
-- Settings
-- ============================================================

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
