//! SQL schema for the KLH Connect SQLite store.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Reporter and claimant are snapshots taken at write time.
CREATE TABLE IF NOT EXISTS items (
    item_id         TEXT PRIMARY KEY,
    kind            TEXT NOT NULL,   -- 'lost' | 'found'
    name            TEXT NOT NULL,
    description     TEXT NOT NULL,
    location        TEXT NOT NULL,
    reporter_uid    TEXT NOT NULL,
    reporter_name   TEXT NOT NULL,
    reporter_email  TEXT NOT NULL,
    reported_at     TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'unclaimed',
    claimant_uid    TEXT,
    claimant_name   TEXT,
    claimant_email  TEXT,
    claimant_phone  TEXT,
    claimed_at      TEXT,
    CHECK ((status = 'unclaimed' AND claimant_uid IS NULL AND claimed_at IS NULL)
        OR (status = 'claimed' AND claimant_uid IS NOT NULL AND claimed_at IS NOT NULL))
);

CREATE TABLE IF NOT EXISTS events (
    event_id      TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    event_date    TEXT NOT NULL,   -- RFC 3339, UTC
    location      TEXT NOT NULL,
    description   TEXT NOT NULL,
    poster_uid    TEXT NOT NULL,
    poster_name   TEXT NOT NULL,
    poster_email  TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    last_updated  TEXT
);

-- Rows are only ever inserted; seq gives the roster its append order.
CREATE TABLE IF NOT EXISTS enrollments (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id     TEXT NOT NULL REFERENCES events(event_id),
    uid          TEXT NOT NULL,
    name         TEXT NOT NULL,
    email        TEXT NOT NULL,
    enrolled_at  TEXT NOT NULL,
    UNIQUE (event_id, uid)
);

CREATE TABLE IF NOT EXISTS users (
    uid            TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    email          TEXT NOT NULL UNIQUE,
    role           TEXT,            -- NULL until the profile is completed
    password_hash  TEXT NOT NULL,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token_digest  TEXT PRIMARY KEY,  -- hex SHA-256 of the bearer token
    uid           TEXT NOT NULL REFERENCES users(uid),
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS enrollments_event_idx ON enrollments(event_id);
CREATE INDEX IF NOT EXISTS sessions_uid_idx      ON sessions(uid);

PRAGMA user_version = 1;
";
