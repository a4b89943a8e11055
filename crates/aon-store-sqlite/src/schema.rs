//! SQL schemas: one for each version's data database, one for the registry.

/// Tables of a single version. Idempotent thanks to `IF NOT EXISTS`.
pub const DATA_SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS sp_species (
    sp_id        INTEGER PRIMARY KEY,
    sp_name      TEXT    NOT NULL,
    sp_taxon_id  INTEGER NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS gn_gene (
    gn_id      INTEGER PRIMARY KEY,
    gn_ref_id  TEXT    NOT NULL UNIQUE,   -- external form, e.g. 'RGD:620664'
    gn_prefix  TEXT    NOT NULL,
    sp_id      INTEGER NOT NULL REFERENCES sp_species(sp_id)
);

CREATE TABLE IF NOT EXISTS alg_algorithm (
    alg_id    INTEGER PRIMARY KEY,
    alg_name  TEXT    NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS ort_ortholog (
    ort_id                            INTEGER PRIMARY KEY,
    from_gene                         INTEGER NOT NULL REFERENCES gn_gene(gn_id),
    to_gene                           INTEGER NOT NULL REFERENCES gn_gene(gn_id),
    ort_is_best                       INTEGER NOT NULL,
    ort_is_best_revised               INTEGER NOT NULL,
    ort_is_best_is_adjusted           INTEGER NOT NULL,
    ort_num_possible_match_algorithms INTEGER NOT NULL,
    ort_source_name                   TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS ora_ortholog_algorithms (
    ort_id  INTEGER NOT NULL REFERENCES ort_ortholog(ort_id) ON DELETE CASCADE,
    alg_id  INTEGER NOT NULL REFERENCES alg_algorithm(alg_id),
    PRIMARY KEY (ort_id, alg_id)
);

-- Derived from ort_ortholog by the clustering pass; replaced wholesale.
CREATE TABLE IF NOT EXISTS hom_homology (
    hom_id           INTEGER NOT NULL,
    gn_id            INTEGER NOT NULL REFERENCES gn_gene(gn_id),
    sp_id            INTEGER NOT NULL REFERENCES sp_species(sp_id),
    hom_source_name  TEXT    NOT NULL,
    PRIMARY KEY (hom_id, gn_id)
);

CREATE INDEX IF NOT EXISTS gn_species_idx  ON gn_gene(sp_id);
CREATE INDEX IF NOT EXISTS ort_from_idx    ON ort_ortholog(from_gene);
CREATE INDEX IF NOT EXISTS ort_to_idx      ON ort_ortholog(to_gene);
CREATE INDEX IF NOT EXISTS ort_source_idx  ON ort_ortholog(ort_source_name);
CREATE INDEX IF NOT EXISTS hom_gene_idx    ON hom_homology(gn_id);

PRAGMA user_version = 1;
";

/// The version registry, kept apart from any single version's data.
pub const REGISTRY_SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS schema_version (
    id             INTEGER PRIMARY KEY,
    schema_name    TEXT    NOT NULL UNIQUE,
    release        TEXT    NOT NULL UNIQUE,
    created_at     TEXT    NOT NULL,   -- RFC 3339 UTC
    state          TEXT    NOT NULL,   -- LoadState, snake_case
    load_complete  INTEGER NOT NULL DEFAULT 0
);

PRAGMA user_version = 1;
";
