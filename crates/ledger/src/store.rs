//! Row mapping between ledger entries and the SQL store.
//!
//! One function pair per entry kind plus the query primitives the root's
//! derived queries run on. All functions operate on a plain connection so
//! they compose with [`Database::transaction`](strata_db::Database)
//! closures for atomic delta application.

use rusqlite::{params, Connection, OptionalExtension, Row};
use strata_db::{schema::state_keys, DbError};
use strata_common::{
    AccountEntry, AccountId, Asset, DataEntry, InflationWinner, LedgerEntry, LedgerEntryData,
    LedgerHeader, LedgerKey, OfferEntry, Price, Thresholds, TrustLineEntry,
};

use crate::txn::MINIMUM_VOTE_BALANCE;

type Result<T> = std::result::Result<T, DbError>;

fn corrupt(what: &str, err: impl std::fmt::Display) -> DbError {
    DbError::Corrupt(format!("{what}: {err}"))
}

fn account_id(text: &str) -> Result<AccountId> {
    AccountId::from_strkey(text).map_err(|e| corrupt("account id", e))
}

fn asset(text: &str) -> Result<Asset> {
    Asset::from_canonical(text).map_err(|e| corrupt("asset", e))
}

// ==================== Writes ====================

/// Inserts or replaces the row for `entry`.
pub(crate) fn upsert_entry(conn: &Connection, entry: &LedgerEntry) -> Result<()> {
    let last_modified = entry.last_modified_ledger_seq;
    match &entry.data {
        LedgerEntryData::Account(account) => {
            let thresholds = serde_json::to_string(&account.thresholds)
                .map_err(|e| corrupt("thresholds", e))?;
            let signers =
                serde_json::to_string(&account.signers).map_err(|e| corrupt("signers", e))?;
            conn.execute(
                "INSERT INTO accounts (accountid, balance, seqnum, numsubentries, \
                 inflationdest, flags, homedomain, thresholds, signers, lastmodified) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
                 ON CONFLICT(accountid) DO UPDATE SET \
                 balance = excluded.balance, seqnum = excluded.seqnum, \
                 numsubentries = excluded.numsubentries, \
                 inflationdest = excluded.inflationdest, flags = excluded.flags, \
                 homedomain = excluded.homedomain, thresholds = excluded.thresholds, \
                 signers = excluded.signers, lastmodified = excluded.lastmodified",
                params![
                    account.account_id.to_strkey(),
                    account.balance,
                    account.seq_num,
                    account.num_sub_entries,
                    account.inflation_dest.map(|d| d.to_strkey()),
                    account.flags,
                    account.home_domain,
                    thresholds,
                    signers,
                    last_modified,
                ],
            )?;
        }
        LedgerEntryData::TrustLine(tl) => {
            conn.execute(
                "INSERT INTO trustlines (accountid, asset, balance, tlimit, flags, lastmodified) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(accountid, asset) DO UPDATE SET \
                 balance = excluded.balance, tlimit = excluded.tlimit, \
                 flags = excluded.flags, lastmodified = excluded.lastmodified",
                params![
                    tl.account_id.to_strkey(),
                    tl.asset.to_canonical(),
                    tl.balance,
                    tl.limit,
                    tl.flags,
                    last_modified,
                ],
            )?;
        }
        LedgerEntryData::Offer(offer) => {
            conn.execute(
                "INSERT INTO offers (sellerid, offerid, sellingasset, buyingasset, \
                 amount, pricen, priced, price, flags, lastmodified) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
                 ON CONFLICT(offerid) DO UPDATE SET \
                 sellerid = excluded.sellerid, sellingasset = excluded.sellingasset, \
                 buyingasset = excluded.buyingasset, amount = excluded.amount, \
                 pricen = excluded.pricen, priced = excluded.priced, \
                 price = excluded.price, flags = excluded.flags, \
                 lastmodified = excluded.lastmodified",
                params![
                    offer.seller_id.to_strkey(),
                    offer.offer_id,
                    offer.selling.to_canonical(),
                    offer.buying.to_canonical(),
                    offer.amount,
                    offer.price.n,
                    offer.price.d,
                    offer.price.as_f64(),
                    offer.flags,
                    last_modified,
                ],
            )?;
        }
        LedgerEntryData::Data(data) => {
            conn.execute(
                "INSERT INTO accountdata (accountid, dataname, datavalue, lastmodified) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(accountid, dataname) DO UPDATE SET \
                 datavalue = excluded.datavalue, lastmodified = excluded.lastmodified",
                params![
                    data.account_id.to_strkey(),
                    data.data_name,
                    data.data_value,
                    last_modified,
                ],
            )?;
        }
    }
    Ok(())
}

/// Deletes the row for `key` if present.
pub(crate) fn delete_entry(conn: &Connection, key: &LedgerKey) -> Result<()> {
    match key {
        LedgerKey::Account(id) => {
            conn.execute(
                "DELETE FROM accounts WHERE accountid = ?1",
                params![id.to_strkey()],
            )?;
        }
        LedgerKey::TrustLine(id, asset) => {
            conn.execute(
                "DELETE FROM trustlines WHERE accountid = ?1 AND asset = ?2",
                params![id.to_strkey(), asset.to_canonical()],
            )?;
        }
        LedgerKey::Offer(_, offer_id) => {
            conn.execute("DELETE FROM offers WHERE offerid = ?1", params![offer_id])?;
        }
        LedgerKey::Data(id, name) => {
            conn.execute(
                "DELETE FROM accountdata WHERE accountid = ?1 AND dataname = ?2",
                params![id.to_strkey(), name],
            )?;
        }
    }
    Ok(())
}

/// Persists the current header.
pub(crate) fn store_header(conn: &Connection, header: &LedgerHeader) -> Result<()> {
    let blob = serde_json::to_string(header).map_err(|e| corrupt("header", e))?;
    conn.execute(
        "INSERT INTO storestate (statename, state) VALUES (?1, ?2) \
         ON CONFLICT(statename) DO UPDATE SET state = excluded.state",
        params![state_keys::LEDGER_HEADER, blob],
    )?;
    Ok(())
}

/// Loads the persisted header, if one has been stored.
pub(crate) fn load_header(conn: &Connection) -> Result<Option<LedgerHeader>> {
    let blob: Option<String> = conn
        .query_row(
            "SELECT state FROM storestate WHERE statename = ?1",
            params![state_keys::LEDGER_HEADER],
            |row| row.get(0),
        )
        .optional()?;
    match blob {
        Some(blob) => {
            let header = serde_json::from_str(&blob).map_err(|e| corrupt("header", e))?;
            Ok(Some(header))
        }
        None => Ok(None),
    }
}

// ==================== Reads ====================

fn row_to_account(row: &Row<'_>) -> Result<LedgerEntry> {
    let accountid: String = row.get(0)?;
    let inflationdest: Option<String> = row.get(4)?;
    let thresholds: String = row.get(7)?;
    let signers: String = row.get(8)?;
    let account = AccountEntry {
        account_id: account_id(&accountid)?,
        balance: row.get(1)?,
        seq_num: row.get(2)?,
        num_sub_entries: row.get(3)?,
        inflation_dest: inflationdest.as_deref().map(account_id).transpose()?,
        flags: row.get(5)?,
        home_domain: row.get(6)?,
        thresholds: serde_json::from_str::<Thresholds>(&thresholds)
            .map_err(|e| corrupt("thresholds", e))?,
        signers: serde_json::from_str(&signers).map_err(|e| corrupt("signers", e))?,
    };
    Ok(LedgerEntry {
        last_modified_ledger_seq: row.get(9)?,
        data: LedgerEntryData::Account(account),
    })
}

const ACCOUNT_COLUMNS: &str = "accountid, balance, seqnum, numsubentries, inflationdest, \
                               flags, homedomain, thresholds, signers, lastmodified";

fn row_to_trustline(row: &Row<'_>) -> Result<LedgerEntry> {
    let accountid: String = row.get(0)?;
    let asset_text: String = row.get(1)?;
    let tl = TrustLineEntry {
        account_id: account_id(&accountid)?,
        asset: asset(&asset_text)?,
        balance: row.get(2)?,
        limit: row.get(3)?,
        flags: row.get(4)?,
    };
    Ok(LedgerEntry {
        last_modified_ledger_seq: row.get(5)?,
        data: LedgerEntryData::TrustLine(tl),
    })
}

fn row_to_offer(row: &Row<'_>) -> Result<LedgerEntry> {
    let sellerid: String = row.get(0)?;
    let selling: String = row.get(2)?;
    let buying: String = row.get(3)?;
    let offer = OfferEntry {
        seller_id: account_id(&sellerid)?,
        offer_id: row.get(1)?,
        selling: asset(&selling)?,
        buying: asset(&buying)?,
        amount: row.get(4)?,
        price: Price::new(row.get(5)?, row.get(6)?),
        flags: row.get(7)?,
    };
    Ok(LedgerEntry {
        last_modified_ledger_seq: row.get(8)?,
        data: LedgerEntryData::Offer(offer),
    })
}

const OFFER_COLUMNS: &str = "sellerid, offerid, sellingasset, buyingasset, amount, \
                             pricen, priced, flags, lastmodified";

fn row_to_data(row: &Row<'_>) -> Result<LedgerEntry> {
    let accountid: String = row.get(0)?;
    let data = DataEntry {
        account_id: account_id(&accountid)?,
        data_name: row.get(1)?,
        data_value: row.get(2)?,
    };
    Ok(LedgerEntry {
        last_modified_ledger_seq: row.get(3)?,
        data: LedgerEntryData::Data(data),
    })
}

/// Loads the committed entry for `key`, if any.
pub(crate) fn load_entry(conn: &Connection, key: &LedgerKey) -> Result<Option<LedgerEntry>> {
    match key {
        LedgerKey::Account(id) => query_entries(
            conn,
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE accountid = ?1"),
            params![id.to_strkey()],
            row_to_account,
        )
        .map(|mut v| v.pop()),
        LedgerKey::TrustLine(id, tl_asset) => query_entries(
            conn,
            "SELECT accountid, asset, balance, tlimit, flags, lastmodified \
             FROM trustlines WHERE accountid = ?1 AND asset = ?2",
            params![id.to_strkey(), tl_asset.to_canonical()],
            row_to_trustline,
        )
        .map(|mut v| v.pop()),
        LedgerKey::Offer(_, offer_id) => query_entries(
            conn,
            &format!("SELECT {OFFER_COLUMNS} FROM offers WHERE offerid = ?1"),
            params![offer_id],
            row_to_offer,
        )
        .map(|mut v| v.pop()),
        LedgerKey::Data(id, name) => query_entries(
            conn,
            "SELECT accountid, dataname, datavalue, lastmodified \
             FROM accountdata WHERE accountid = ?1 AND dataname = ?2",
            params![id.to_strkey(), name],
            row_to_data,
        )
        .map(|mut v| v.pop()),
    }
}

fn query_entries(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    map: fn(&Row<'_>) -> Result<LedgerEntry>,
) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        entries.push(map(row)?);
    }
    Ok(entries)
}

/// All committed offers.
pub(crate) fn load_all_offers(conn: &Connection) -> Result<Vec<LedgerEntry>> {
    query_entries(
        conn,
        &format!("SELECT {OFFER_COLUMNS} FROM offers ORDER BY offerid"),
        params![],
        row_to_offer,
    )
}

/// Committed offers for `(buying, selling)`, price ratio ascending with
/// offer ID as the tie-break.
pub(crate) fn load_offers_by_pair(
    conn: &Connection,
    buying: &Asset,
    selling: &Asset,
) -> Result<Vec<LedgerEntry>> {
    query_entries(
        conn,
        &format!(
            "SELECT {OFFER_COLUMNS} FROM offers \
             WHERE buyingasset = ?1 AND sellingasset = ?2 \
             ORDER BY price, offerid"
        ),
        params![buying.to_canonical(), selling.to_canonical()],
        row_to_offer,
    )
}

/// Committed offers sold by `account` where `asset` is either side.
pub(crate) fn load_offers_by_account_and_asset(
    conn: &Connection,
    account: &AccountId,
    asset: &Asset,
) -> Result<Vec<LedgerEntry>> {
    let canonical = asset.to_canonical();
    query_entries(
        conn,
        &format!(
            "SELECT {OFFER_COLUMNS} FROM offers \
             WHERE sellerid = ?1 AND (sellingasset = ?2 OR buyingasset = ?2) \
             ORDER BY offerid"
        ),
        params![account.to_strkey(), canonical],
        row_to_offer,
    )
}

/// Aggregated inflation winners over committed accounts.
///
/// Only votes from accounts holding at least the minimum vote balance
/// count. `inflationdest` stores StrKey text, so the SQL `DESC` on the
/// column is the descending string-form tie-break.
pub(crate) fn load_inflation_winners(
    conn: &Connection,
    max_winners: usize,
    min_votes: i64,
) -> Result<Vec<InflationWinner>> {
    let mut stmt = conn.prepare(
        "SELECT inflationdest, SUM(balance) AS votes FROM accounts \
         WHERE inflationdest IS NOT NULL AND balance >= ?1 \
         GROUP BY inflationdest HAVING SUM(balance) >= ?2 \
         ORDER BY votes DESC, inflationdest DESC LIMIT ?3",
    )?;
    let mut rows = stmt.query(params![MINIMUM_VOTE_BALANCE, min_votes, max_winners as i64])?;
    let mut winners = Vec::new();
    while let Some(row) = rows.next()? {
        let dest: String = row.get(0)?;
        winners.push(InflationWinner {
            account_id: account_id(&dest)?,
            votes: row.get(1)?,
        });
    }
    Ok(winners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::Signer;
    use strata_db::Database;

    fn acct(seed: u8) -> AccountId {
        AccountId([seed; 32])
    }

    fn account_entry(seed: u8, balance: i64) -> LedgerEntry {
        LedgerEntry {
            last_modified_ledger_seq: 3,
            data: LedgerEntryData::Account(AccountEntry {
                account_id: acct(seed),
                balance,
                seq_num: 5,
                num_sub_entries: 1,
                inflation_dest: Some(acct(9)),
                flags: 2,
                home_domain: "example.org".to_string(),
                thresholds: Thresholds([1, 2, 3, 4]),
                signers: vec![Signer {
                    key: strata_common::SignerKey::Ed25519([7; 32]),
                    weight: 1,
                }],
            }),
        }
    }

    fn offer_entry(seed: u8, offer_id: i64, price: Price) -> LedgerEntry {
        LedgerEntry {
            last_modified_ledger_seq: 3,
            data: LedgerEntryData::Offer(OfferEntry {
                seller_id: acct(seed),
                offer_id,
                selling: Asset::Native,
                buying: Asset::credit4("USD", acct(8)),
                amount: 10,
                price,
                flags: 0,
            }),
        }
    }

    #[test]
    fn test_account_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let entry = account_entry(1, 500);
        db.with_connection(|conn| upsert_entry(conn, &entry)).unwrap();
        let loaded = db
            .with_connection(|conn| load_entry(conn, &entry.ledger_key()))
            .unwrap();
        assert_eq!(loaded, Some(entry.clone()));

        db.with_connection(|conn| delete_entry(conn, &entry.ledger_key()))
            .unwrap();
        let gone = db
            .with_connection(|conn| load_entry(conn, &entry.ledger_key()))
            .unwrap();
        assert_eq!(gone, None);
    }

    #[test]
    fn test_trustline_and_data_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let tl = LedgerEntry {
            last_modified_ledger_seq: 2,
            data: LedgerEntryData::TrustLine(TrustLineEntry {
                account_id: acct(1),
                asset: Asset::credit4("EUR", acct(2)),
                balance: 44,
                limit: 1000,
                flags: 1,
            }),
        };
        let data = LedgerEntry {
            last_modified_ledger_seq: 2,
            data: LedgerEntryData::Data(DataEntry {
                account_id: acct(1),
                data_name: "config".to_string(),
                data_value: vec![1, 2, 3],
            }),
        };
        db.with_connection(|conn| {
            upsert_entry(conn, &tl)?;
            upsert_entry(conn, &data)
        })
        .unwrap();
        assert_eq!(
            db.with_connection(|conn| load_entry(conn, &tl.ledger_key()))
                .unwrap(),
            Some(tl)
        );
        assert_eq!(
            db.with_connection(|conn| load_entry(conn, &data.ledger_key()))
                .unwrap(),
            Some(data)
        );
    }

    #[test]
    fn test_offers_by_pair_ordering() {
        let db = Database::open_in_memory().unwrap();
        let buying = Asset::credit4("USD", acct(8));
        let selling = Asset::Native;
        db.with_connection(|conn| {
            upsert_entry(conn, &offer_entry(1, 1, Price::new(2, 1)))?;
            upsert_entry(conn, &offer_entry(1, 2, Price::new(1, 1)))?;
            upsert_entry(conn, &offer_entry(1, 3, Price::new(1, 1)))
        })
        .unwrap();
        let offers = db
            .with_connection(|conn| load_offers_by_pair(conn, &buying, &selling))
            .unwrap();
        let ids: Vec<i64> = offers
            .iter()
            .filter_map(|e| e.as_offer().map(|o| o.offer_id))
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_inflation_winner_floor() {
        let db = Database::open_in_memory().unwrap();
        // Voter below the eligibility floor never counts.
        let mut small = account_entry(1, MINIMUM_VOTE_BALANCE - 1);
        if let LedgerEntryData::Account(a) = &mut small.data {
            a.inflation_dest = Some(acct(9));
        }
        db.with_connection(|conn| upsert_entry(conn, &small)).unwrap();
        let winners = db
            .with_connection(|conn| load_inflation_winners(conn, 5, 1))
            .unwrap();
        assert!(winners.is_empty());
    }

    #[test]
    fn test_header_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.with_connection(load_header).unwrap(), None);
        let header = LedgerHeader {
            ledger_seq: 12,
            ..LedgerHeader::genesis()
        };
        db.with_connection(|conn| store_header(conn, &header))
            .unwrap();
        assert_eq!(db.with_connection(load_header).unwrap(), Some(header));
    }
}
