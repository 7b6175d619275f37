//! Content catalog query functions (movies and festival blocks).
//!
//! The catalog is owned by the manifest collaborator; the revenue core reads
//! it for authoritative prices and for film → filmmaker attribution.

use marquee_types::catalog::{FestivalBlock, Movie};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::{DbError, Result};

/// Insert a movie.
pub fn insert_movie(conn: &Connection, movie: &Movie, created_at: u64) -> Result<()> {
    conn.execute(
        "INSERT INTO movies (id, title, filmmaker, sale_price, watch_party_price, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            movie.id,
            movie.title,
            movie.filmmaker,
            movie.sale_price.map(|p| p as i64),
            movie.watch_party_price.map(|p| p as i64),
            created_at as i64,
        ],
    )?;
    Ok(())
}

/// Look up a movie by id.
pub fn get_movie(conn: &Connection, id: &str) -> Result<Option<Movie>> {
    let movie = conn
        .query_row(
            "SELECT id, title, filmmaker, sale_price, watch_party_price
             FROM movies WHERE id = ?1",
            [id],
            movie_from_row,
        )
        .optional()?;
    Ok(movie)
}

/// List every movie, ordered by title.
pub fn list_movies(conn: &Connection) -> Result<Vec<Movie>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, filmmaker, sale_price, watch_party_price
         FROM movies ORDER BY title",
    )?;

    let rows = stmt
        .query_map([], movie_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Insert a festival block.
pub fn insert_block(conn: &Connection, block: &FestivalBlock) -> Result<()> {
    let film_ids = serde_json::to_string(&block.film_ids)
        .map_err(|e| DbError::Serialization(e.to_string()))?;
    conn.execute(
        "INSERT INTO festival_blocks (id, title, price, film_ids) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![block.id, block.title, block.price.map(|p| p as i64), film_ids],
    )?;
    Ok(())
}

/// Look up a festival block by id.
pub fn get_block(conn: &Connection, id: &str) -> Result<Option<FestivalBlock>> {
    let raw = conn
        .query_row(
            "SELECT id, title, price, film_ids FROM festival_blocks WHERE id = ?1",
            [id],
            raw_block_from_row,
        )
        .optional()?;
    raw.map(RawBlock::decode).transpose()
}

/// List every festival block, ordered by title.
pub fn list_blocks(conn: &Connection) -> Result<Vec<FestivalBlock>> {
    let mut stmt =
        conn.prepare("SELECT id, title, price, film_ids FROM festival_blocks ORDER BY title")?;

    let raw = stmt
        .query_map([], raw_block_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter().map(RawBlock::decode).collect()
}

fn movie_from_row(row: &Row<'_>) -> rusqlite::Result<Movie> {
    Ok(Movie {
        id: row.get(0)?,
        title: row.get(1)?,
        filmmaker: row.get(2)?,
        sale_price: row.get::<_, Option<i64>>(3)?.map(|p| p as u64),
        watch_party_price: row.get::<_, Option<i64>>(4)?.map(|p| p as u64),
    })
}

/// A block row before its film list is decoded.
struct RawBlock {
    id: String,
    title: String,
    price: Option<i64>,
    film_ids_json: String,
}

impl RawBlock {
    fn decode(self) -> Result<FestivalBlock> {
        let film_ids: Vec<String> = serde_json::from_str(&self.film_ids_json)
            .map_err(|e| DbError::Serialization(format!("block {}: {e}", self.id)))?;
        Ok(FestivalBlock {
            id: self.id,
            title: self.title,
            price: self.price.map(|p| p as u64),
            film_ids,
        })
    }
}

fn raw_block_from_row(row: &Row<'_>) -> rusqlite::Result<RawBlock> {
    Ok(RawBlock {
        id: row.get(0)?,
        title: row.get(1)?,
        price: row.get(2)?,
        film_ids_json: row.get(3)?,
    })
}
