//! [`Property`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{property, Property},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `properties` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, landlord_id, \
    title, description, kind, price, location, \
    bedrooms, bathrooms, area_sqft, \
    images, amenities, \
    status, verified, rejection_reason, \
    created_at";

/// Reads a [`Property`] out of the provided [`Row`] selected with [`COLUMNS`].
fn from_row(row: &Row) -> Property {
    Property {
        id: row.get("id"),
        landlord_id: row.get("landlord_id"),
        title: row.get("title"),
        description: row.get("description"),
        kind: row.get("kind"),
        price: row.get("price"),
        location: row.get("location"),
        bedrooms: row.get("bedrooms"),
        bathrooms: row.get("bathrooms"),
        area_sqft: row.get("area_sqft"),
        images: row.get("images"),
        amenities: row.get("amenities"),
        status: row.get("status"),
        verified: row.get("verified"),
        rejection_reason: row.get("rejection_reason"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Property>, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Property>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: property::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM properties \
             WHERE id = $1::UUID"
        );
        self.query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Property>, read::property::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Property>, read::property::list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        use read::property::{catalog, list::Selector};

        let selector = by.into_inner();

        let (status, landlord_id, search, kind, min, max);
        let mut limit = None;

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![];
        let mut conditions: Vec<String> = vec![];
        match &selector {
            Selector::Catalog { filter, limit: l } => {
                let catalog::Filter {
                    search: s,
                    kind: k,
                    price,
                } = filter;

                status = property::Status::Available;
                ps.push(&status);
                conditions.push(format!("status = ${}::VARCHAR", ps.len()));

                search = s.as_ref().map(|s| s.needle().to_owned());
                if let Some(needle) = &search {
                    ps.push(needle);
                    let idx = ps.len();
                    conditions.push(format!(
                        "(STRPOS(LOWER(title), ${idx}::VARCHAR) > 0 \
                          OR STRPOS(LOWER(location), ${idx}::VARCHAR) > 0 \
                          OR STRPOS(LOWER(description), ${idx}::VARCHAR) > 0)",
                    ));
                }
                kind = *k;
                if let Some(kind) = &kind {
                    ps.push(kind);
                    conditions.push(format!("kind = ${}::VARCHAR", ps.len()));
                }
                min = price.min;
                max = price.max;
                if let Some(min) = &min {
                    ps.push(min);
                    conditions.push(format!("price >= ${}::NUMERIC", ps.len()));
                }
                if let Some(max) = &max {
                    ps.push(max);
                    conditions.push(format!("price <= ${}::NUMERIC", ps.len()));
                }
                limit = l.map(|l| i64::try_from(l).unwrap_or(i64::MAX));
            }
            Selector::OwnedBy(id) => {
                landlord_id = *id;
                ps.push(&landlord_id);
                conditions.push(format!("landlord_id = ${}::UUID", ps.len()));
            }
            Selector::All => {}
        }

        let limit_idx = limit.as_ref().map(|l| {
            ps.push(l);
            ps.len()
        });

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM properties \
             WHERE true {conditions} \
             ORDER BY created_at DESC, id \
             {limit}",
            conditions = conditions
                .iter()
                .format_with("", |c, f| f(&format_args!("AND {c} "))),
            limit = limit_idx
                .into_iter()
                .format_with("", |idx, f| f(&format_args!("LIMIT ${idx}::INT8"))),
        );
        Ok(self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Property>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Property>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(property): Insert<Property>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(property)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Property>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(property): Update<Property>,
    ) -> Result<Self::Ok, Self::Err> {
        let Property {
            id,
            landlord_id,
            title,
            description,
            kind,
            price,
            location,
            bedrooms,
            bathrooms,
            area_sqft,
            images,
            amenities,
            status,
            verified,
            rejection_reason,
            created_at,
        } = property;

        const SQL: &str = "\
            INSERT INTO properties (\
                id, landlord_id, \
                title, description, kind, price, location, \
                bedrooms, bathrooms, area_sqft, \
                images, amenities, \
                status, verified, rejection_reason, \
                created_at \
            ) VALUES (\
                $1::UUID, $2::UUID, \
                $3::VARCHAR, $4::TEXT, $5::VARCHAR, $6::NUMERIC, \
                $7::VARCHAR, \
                $8::INT2, $9::INT2, $10::INT4, \
                $11::VARCHAR[], $12::VARCHAR[], \
                $13::VARCHAR, $14::BOOL, $15::TEXT, \
                $16::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET title = EXCLUDED.title, \
                description = EXCLUDED.description, \
                kind = EXCLUDED.kind, \
                price = EXCLUDED.price, \
                location = EXCLUDED.location, \
                bedrooms = EXCLUDED.bedrooms, \
                bathrooms = EXCLUDED.bathrooms, \
                area_sqft = EXCLUDED.area_sqft, \
                images = EXCLUDED.images, \
                amenities = EXCLUDED.amenities, \
                status = EXCLUDED.status, \
                verified = EXCLUDED.verified, \
                rejection_reason = EXCLUDED.rejection_reason";
        self.exec(
            SQL,
            &[
                &id,
                &landlord_id,
                &title,
                &description,
                &kind,
                &price,
                &location,
                &bedrooms,
                &bathrooms,
                &area_sqft,
                &images,
                &amenities,
                &status,
                &verified,
                &rejection_reason,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Property, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: property::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM properties \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Property, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: property::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM properties \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
