//! Postgres-backed [`CountryStore`].
//!
//! Uses sqlx `query()` + binds (no compile-time macros), so the crate builds
//! without a live database.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cfx_schemas::{name_key, CountryRecord, CountryWrite, ListQuery, SortKey, StatusSummary};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::store::CountryStore;

const COLUMNS: &str = "id, name, capital, region, population, currency_code, exchange_rate, \
                       estimated_gdp, flag_url, last_refreshed_at";

#[derive(Debug, Clone)]
pub struct PgCountryStore {
    pool: PgPool,
}

impl PgCountryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn order_by(sort: SortKey) -> &'static str {
    match sort {
        SortKey::GdpDesc => "estimated_gdp desc, id asc",
        SortKey::GdpAsc => "estimated_gdp asc, id asc",
        SortKey::PopulationDesc => "population desc, id asc",
        SortKey::PopulationAsc => "population asc, id asc",
        SortKey::NameAsc => "name asc, id asc",
        SortKey::NameDesc => "name desc, id asc",
    }
}

fn row_to_record(r: &PgRow) -> Result<CountryRecord> {
    Ok(CountryRecord {
        id: r.try_get::<i64, _>("id").context("countries.id")?,
        name: r.try_get::<String, _>("name").context("countries.name")?,
        capital: r.try_get::<String, _>("capital").context("countries.capital")?,
        region: r.try_get::<String, _>("region").context("countries.region")?,
        population: r
            .try_get::<i64, _>("population")
            .context("countries.population")?,
        currency_code: r
            .try_get::<Option<String>, _>("currency_code")
            .context("countries.currency_code")?,
        exchange_rate: r
            .try_get::<Option<f64>, _>("exchange_rate")
            .context("countries.exchange_rate")?,
        estimated_gdp: r
            .try_get::<f64, _>("estimated_gdp")
            .context("countries.estimated_gdp")?,
        flag_url: r.try_get::<String, _>("flag_url").context("countries.flag_url")?,
        last_refreshed_at: r
            .try_get::<DateTime<Utc>, _>("last_refreshed_at")
            .context("countries.last_refreshed_at")?,
    })
}

#[async_trait]
impl CountryStore for PgCountryStore {
    async fn name_keys(&self) -> Result<HashSet<String>> {
        // Fold with name_key(), not SQL lower(); they differ on non-ASCII
        // names under a C-locale database.
        let rows: Vec<(String,)> = sqlx::query_as("select name from countries")
            .fetch_all(&self.pool)
            .await
            .context("name_keys query failed")?;
        Ok(rows.into_iter().map(|(n,)| name_key(&n)).collect())
    }

    async fn apply_batch(&self, writes: &[CountryWrite], refreshed_at: DateTime<Utc>) -> Result<usize> {
        let mut tx = self.pool.begin().await.context("begin batch tx failed")?;

        for w in writes {
            // Conflict target is the lower(name) unique index, so a concurrent
            // insert of the same country degrades to an update.
            sqlx::query(
                r#"
                insert into countries (
                  name, capital, region, population,
                  currency_code, exchange_rate, estimated_gdp,
                  flag_url, last_refreshed_at
                ) values ($1,$2,$3,$4,$5,$6,$7,$8,$9)
                on conflict ((lower(name))) do update set
                  name = excluded.name,
                  capital = excluded.capital,
                  region = excluded.region,
                  population = excluded.population,
                  currency_code = excluded.currency_code,
                  exchange_rate = excluded.exchange_rate,
                  estimated_gdp = excluded.estimated_gdp,
                  flag_url = excluded.flag_url,
                  last_refreshed_at = excluded.last_refreshed_at
                "#,
            )
            .bind(&w.name)
            .bind(&w.capital)
            .bind(&w.region)
            .bind(w.population)
            .bind(&w.currency_code)
            .bind(w.exchange_rate)
            .bind(w.estimated_gdp)
            .bind(&w.flag_url)
            .bind(refreshed_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("upsert country '{}' failed", w.name))?;
        }

        tx.commit().await.context("commit batch tx failed")?;
        Ok(writes.len())
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<CountryRecord>> {
        let sql = format!(
            r#"
            select {COLUMNS}
            from countries
            where ($1::text is null or strpos(lower(region), lower($1)) > 0)
              and ($2::text is null or currency_code = upper($2))
            order by {}
            "#,
            order_by(query.sort)
        );

        let rows = sqlx::query(&sql)
            .bind(query.region.as_deref())
            .bind(query.currency.as_deref())
            .fetch_all(&self.pool)
            .await
            .context("list countries query failed")?;

        rows.iter().map(row_to_record).collect()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CountryRecord>> {
        let sql = format!("select {COLUMNS} from countries where lower(name) = lower($1)");
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("find_by_name query failed")?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn delete_by_name(&self, name: &str) -> Result<Option<CountryRecord>> {
        let sql = format!("delete from countries where lower(name) = lower($1) returning {COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("delete_by_name failed")?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn status(&self) -> Result<StatusSummary> {
        let row = sqlx::query(
            r#"
            select count(*)::bigint as total, max(last_refreshed_at) as last_refreshed_at
            from countries
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("status query failed")?;

        Ok(StatusSummary {
            total_countries: row.try_get::<i64, _>("total").context("status.total")?,
            last_refreshed_at: row
                .try_get::<Option<DateTime<Utc>>, _>("last_refreshed_at")
                .context("status.last_refreshed_at")?,
        })
    }
}
