//! [`Profile`]-related [`Database`] implementations.

use common::operations::{By, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{profile, Profile},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Reads a [`Profile`] out of the provided [`Row`].
fn from_row(row: &Row) -> Profile {
    Profile {
        id: row.get("id"),
        full_name: row.get("full_name"),
        phone: row.get("phone"),
        email: row.get("email"),
        role: row.get("role"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Profile>, profile::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Profile>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Profile>, profile::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: profile::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, full_name, phone, email, role, created_at \
            FROM profiles \
            WHERE id = $1::UUID";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Profile>, read::profile::list::All>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Profile>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Profile>, read::profile::list::All>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT id, full_name, phone, email, role, created_at \
            FROM profiles \
            ORDER BY created_at DESC, id";
        Ok(self
            .query(SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Update<Profile>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(profile): Update<Profile>,
    ) -> Result<Self::Ok, Self::Err> {
        let Profile {
            id,
            full_name,
            phone,
            email,
            role,
            created_at,
        } = profile;

        const SQL: &str = "\
            INSERT INTO profiles (\
                id, full_name, phone, email, role, created_at\
            ) VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, \
                $5::VARCHAR, $6::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET full_name = EXCLUDED.full_name, \
                phone = EXCLUDED.phone, \
                email = EXCLUDED.email, \
                role = EXCLUDED.role";
        self.exec(
            SQL,
            &[&id, &full_name, &phone, &email, &role, &created_at],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Profile, profile::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Profile, profile::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: profile::Id = by.into_inner();

        // `Profile` may not exist yet, so there is no row to lock.
        const SQL: &str = "\
            SELECT pg_advisory_xact_lock(hashtextextended($1::UUID::TEXT, 0))";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
