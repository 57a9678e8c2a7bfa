use crate::error::{Error, Result};
use crate::spend::OutputType;
use crate::store::model::{decimal_to_u256, u256_to_decimal, ChainsawStatus, ChannelRow, Output};
use crate::store::Store;
use async_trait::async_trait;
use ethers::types::{Address, U256};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::SystemTime;

/// `sqlx`-backed implementation of [`Store`]. Chosen over the teacher's
/// synchronous `diesel`/`r2d2` stack because every call site here already
/// runs inside a tokio task (see `SPEC_FULL.md`'s `[PERSISTENCE]` section).
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| Error::PersistenceError(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::PersistenceError(e.to_string()))?;

        Ok(PgStore { pool })
    }

    fn row_to_output(row: &sqlx::postgres::PgRow) -> Result<Output> {
        let id: Vec<u8> = row.try_get("id").map_err(store_err)?;
        let contract_address: Vec<u8> = row.try_get("contract_address").map_err(store_err)?;
        let amount: bigdecimal::BigDecimal = row.try_get("amount").map_err(store_err)?;
        let block_number: i64 = row.try_get("block_number").map_err(store_err)?;
        let tx_hash: Vec<u8> = row.try_get("tx_hash").map_err(store_err)?;
        let script: Vec<u8> = row.try_get("script").map_err(store_err)?;
        let spent: bool = row.try_get("spent").map_err(store_err)?;
        let withdrawn: bool = row.try_get("withdrawn").map_err(store_err)?;

        Ok(Output {
            id: to_array32(&id)?,
            contract_address: Address::from_slice(&contract_address),
            amount: decimal_to_u256(&amount),
            block_number: block_number as u64,
            tx_hash: to_array32(&tx_hash)?,
            script,
            spent,
            withdrawn,
        })
    }
}

fn store_err(e: sqlx::Error) -> Error {
    Error::PersistenceError(e.to_string())
}

fn to_array32(bytes: &[u8]) -> Result<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|_| Error::PersistenceError("expected a 32-byte column value".into()))
}

#[async_trait]
impl Store for PgStore {
    async fn commit_block_range(
        &self,
        upserts: &[Output],
        spent_ids: &[[u8; 32]],
        withdrawals: &[(Address, U256)],
        new_last_seen: u64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        for output in upserts {
            let output_type = output
                .output_type()
                .map(|t| t.as_byte() as i16)
                .unwrap_or(0);
            sqlx::query(
                "INSERT INTO outputs (id, contract_address, amount, block_number, tx_hash, script, type, spent, withdrawn)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (id) DO UPDATE SET
                    amount = EXCLUDED.amount,
                    block_number = EXCLUDED.block_number,
                    tx_hash = EXCLUDED.tx_hash,
                    script = EXCLUDED.script,
                    type = EXCLUDED.type",
            )
            .bind(output.id.to_vec())
            .bind(output.contract_address.as_bytes().to_vec())
            .bind(u256_to_decimal(output.amount))
            .bind(output.block_number as i64)
            .bind(output.tx_hash.to_vec())
            .bind(output.script.clone())
            .bind(output_type)
            .bind(output.spent)
            .bind(output.withdrawn)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }

        for id in spent_ids {
            sqlx::query("UPDATE outputs SET spent = TRUE WHERE id = $1")
                .bind(id.to_vec())
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
        }

        for (owner, value) in withdrawals {
            // §9 open question: `Withdrawal` carries no output id, so the
            // contract's owner+value pair is the lookup key, matching the
            // original implementation exactly.
            sqlx::query(
                "UPDATE outputs SET withdrawn = TRUE
                 WHERE NOT withdrawn
                   AND type = 1
                   AND amount = $2
                   AND substring(script from 2 for 20) = $1",
            )
            .bind(owner.as_bytes().to_vec())
            .bind(u256_to_decimal(*value))
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }

        sqlx::query(
            "UPDATE chainsaw_status SET last_seen_block = $1, last_polled_at = now()
             WHERE singleton = TRUE AND last_seen_block <= $1",
        )
        .bind(new_last_seen as i64)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        tx.commit().await.map_err(store_err)
    }

    async fn get_output(&self, id: [u8; 32]) -> Result<Option<Output>> {
        let row = sqlx::query("SELECT * FROM outputs WHERE id = $1")
            .bind(id.to_vec())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(Self::row_to_output).transpose()
    }

    async fn find_spendable_output(&self, owner: Address, amount: U256) -> Result<Option<Output>> {
        let rows = sqlx::query(
            "SELECT * FROM outputs
             WHERE type = $1 AND amount = $2 AND NOT spent AND NOT withdrawn",
        )
        .bind(OutputType::Payment.as_byte() as i16)
        .bind(u256_to_decimal(amount))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        for row in &rows {
            let output = Self::row_to_output(row)?;
            if output.script.len() == 21 && &output.script[1..21] == owner.as_bytes() {
                return Ok(Some(output));
            }
        }
        Ok(None)
    }

    async fn get_chainsaw_status(&self) -> Result<ChainsawStatus> {
        let row = sqlx::query("SELECT last_seen_block, last_polled_at FROM chainsaw_status")
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        let last_seen_block: i64 = row.try_get("last_seen_block").map_err(store_err)?;
        let last_polled_at: chrono::DateTime<chrono::Utc> =
            row.try_get("last_polled_at").map_err(store_err)?;
        Ok(ChainsawStatus {
            last_seen_block: last_seen_block as u64,
            last_polled_at: SystemTime::from(last_polled_at),
        })
    }

    async fn insert_channel(&self, row: ChannelRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO channels (id, funding_output, counterparty) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(row.id.to_vec())
        .bind(row.funding_output.to_vec())
        .bind(row.counterparty.to_vec())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get_channel(&self, id: [u8; 32]) -> Result<Option<ChannelRow>> {
        let row = sqlx::query("SELECT id, funding_output, counterparty FROM channels WHERE id = $1")
            .bind(id.to_vec())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        let Some(row) = row else { return Ok(None) };
        let id: Vec<u8> = row.try_get("id").map_err(store_err)?;
        let funding_output: Vec<u8> = row.try_get("funding_output").map_err(store_err)?;
        let counterparty: Vec<u8> = row.try_get("counterparty").map_err(store_err)?;
        Ok(Some(ChannelRow {
            id: to_array32(&id)?,
            funding_output: to_array32(&funding_output)?,
            counterparty: counterparty
                .try_into()
                .map_err(|_| Error::PersistenceError("expected a 33-byte pubkey column".into()))?,
        }))
    }
}
