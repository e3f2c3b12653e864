//! SQL schema for the registrar SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS students (
    id              TEXT PRIMARY KEY,
    identity_number TEXT NOT NULL UNIQUE,   -- normalized
    first_name      TEXT NOT NULL,
    last_name       TEXT NOT NULL,
    email           TEXT
);

CREATE TABLE IF NOT EXISTS teachers (
    id           TEXT PRIMARY KEY,
    staff_number TEXT NOT NULL UNIQUE,      -- normalized
    first_name   TEXT NOT NULL,
    last_name    TEXT NOT NULL,
    email        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS degree_programs (
    id           TEXT PRIMARY KEY,
    code         TEXT NOT NULL UNIQUE,      -- upper-cased, no whitespace
    name         TEXT NOT NULL,
    program_type TEXT NOT NULL              -- 'Undergraduate' | 'Graduate' | 'Technical'
);

CREATE TABLE IF NOT EXISTS program_plans (
    id             TEXT PRIMARY KEY,
    program_id     TEXT NOT NULL REFERENCES degree_programs(id),
    effective_year INTEGER NOT NULL,
    duration_years INTEGER NOT NULL,
    state          TEXT NOT NULL DEFAULT 'Draft',  -- 'Draft' | 'Current' | 'Legacy'
    UNIQUE (program_id, effective_year)
);

CREATE TABLE IF NOT EXISTS subjects (
    id   TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE               -- whitespace-collapsed
);

CREATE TABLE IF NOT EXISTS plan_subjects (
    id           TEXT PRIMARY KEY,
    plan_id      TEXT NOT NULL REFERENCES program_plans(id),
    subject_id   TEXT NOT NULL REFERENCES subjects(id),
    year_in_plan INTEGER NOT NULL,
    term         TEXT NOT NULL,             -- 'S1' | 'S2'
    state        TEXT NOT NULL DEFAULT 'Active',
    UNIQUE (plan_id, subject_id)
);

CREATE INDEX IF NOT EXISTS program_plans_program_idx ON program_plans(program_id);
CREATE INDEX IF NOT EXISTS plan_subjects_subject_idx ON plan_subjects(subject_id);

PRAGMA user_version = 1;
";
