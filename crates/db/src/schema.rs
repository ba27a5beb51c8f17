//! Database schema definitions.
//!
//! Typed tables per entry kind so that the derived ledger queries (best
//! offer per asset pair, offers by account and asset, inflation winners)
//! run as plain SQL over real columns:
//!
//! - **accounts**: one row per account, keyed by the StrKey account ID.
//!   `inflationdest` holds the destination's StrKey, so descending text
//!   order on the column is exactly the winner tie-break order.
//! - **trustlines** / **offers** / **accountdata**: one row per entry,
//!   with assets stored in their canonical string form. Offers carry both
//!   the rational price terms and the precomputed real ratio used for
//!   ordering.
//! - **storestate**: key-value store holding the serialized ledger header
//!   and other node state.

/// Complete SQL schema for initializing a fresh database.
///
/// Safe to re-run on an existing database.
pub const CREATE_SCHEMA: &str = r#"
-- Node state key-value store (holds the ledger header, schema version)
CREATE TABLE IF NOT EXISTS storestate (
    statename TEXT PRIMARY KEY,
    state TEXT NOT NULL
);

-- Account entries
CREATE TABLE IF NOT EXISTS accounts (
    accountid TEXT PRIMARY KEY,
    balance BIGINT NOT NULL,
    seqnum BIGINT NOT NULL,
    numsubentries INT NOT NULL,
    inflationdest TEXT,
    flags INT NOT NULL,
    homedomain TEXT NOT NULL,
    thresholds TEXT NOT NULL,
    signers TEXT NOT NULL,
    lastmodified INT NOT NULL
);
CREATE INDEX IF NOT EXISTS accounts_inflation
    ON accounts(inflationdest) WHERE inflationdest IS NOT NULL;

-- Trust line entries
CREATE TABLE IF NOT EXISTS trustlines (
    accountid TEXT NOT NULL,
    asset TEXT NOT NULL,
    balance BIGINT NOT NULL,
    tlimit BIGINT NOT NULL,
    flags INT NOT NULL,
    lastmodified INT NOT NULL,
    PRIMARY KEY (accountid, asset)
);

-- Offer entries
CREATE TABLE IF NOT EXISTS offers (
    sellerid TEXT NOT NULL,
    offerid BIGINT PRIMARY KEY,
    sellingasset TEXT NOT NULL,
    buyingasset TEXT NOT NULL,
    amount BIGINT NOT NULL,
    pricen INT NOT NULL,
    priced INT NOT NULL,
    price DOUBLE NOT NULL,
    flags INT NOT NULL,
    lastmodified INT NOT NULL
);
CREATE INDEX IF NOT EXISTS offers_by_pair
    ON offers(buyingasset, sellingasset, price, offerid);
CREATE INDEX IF NOT EXISTS offers_by_seller ON offers(sellerid);

-- Data entries
CREATE TABLE IF NOT EXISTS accountdata (
    accountid TEXT NOT NULL,
    dataname TEXT NOT NULL,
    datavalue BLOB NOT NULL,
    lastmodified INT NOT NULL,
    PRIMARY KEY (accountid, dataname)
);
"#;

/// Well-known keys for the `storestate` table.
pub mod state_keys {
    /// Serialized current ledger header.
    pub const LEDGER_HEADER: &str = "ledgerheader";

    /// Current database schema version.
    pub const DATABASE_SCHEMA: &str = "databaseschema";
}

/// Current schema version, recorded in `storestate`.
pub const SCHEMA_VERSION: u32 = 1;
