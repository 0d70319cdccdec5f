//! [`ContactPurchase`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::{purchase, ContactPurchase},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

impl<C> Database<Select<By<read::purchase::IsPurchased, purchase::Key>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::purchase::IsPurchased;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::purchase::IsPurchased, purchase::Key>>,
    ) -> Result<Self::Ok, Self::Err> {
        let purchase::Key {
            user_id,
            property_id,
        } = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM contact_purchases \
            WHERE user_id = $1::UUID \
              AND property_id = $2::UUID \
            LIMIT 1";
        self.query_opt(SQL, &[&user_id, &property_id])
            .await
            .map_err(tracerr::wrap!())
            .map(|r| read::purchase::IsPurchased(r.is_some()))
    }
}

impl<C> Database<Select<By<Vec<read::purchase::Listed>, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<read::purchase::Listed>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<read::purchase::Listed>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT cp.id, cp.user_id, cp.property_id, cp.amount, \
                   cp.payment_status, cp.phone, cp.payment_id, \
                   cp.created_at, \
                   p.title AS property_title, \
                   pr.full_name AS buyer_name \
            FROM contact_purchases AS cp \
            LEFT JOIN properties AS p ON p.id = cp.property_id \
            LEFT JOIN profiles AS pr ON pr.id = cp.user_id \
            ORDER BY cp.created_at DESC, cp.id";
        Ok(self
            .query(SQL, &[])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| read::purchase::Listed {
                purchase: ContactPurchase {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    property_id: row.get("property_id"),
                    amount: row.get("amount"),
                    payment_status: row.get("payment_status"),
                    phone: row.get("phone"),
                    payment_id: row.get("payment_id"),
                    created_at: row.get("created_at"),
                },
                property_title: row.get("property_title"),
                buyer_name: row.get("buyer_name"),
            })
            .collect())
    }
}

impl<C> Database<Insert<ContactPurchase>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    /// Inserts the [`ContactPurchase`], unless one already exists for its
    /// [`purchase::Key`].
    async fn execute(
        &self,
        Insert(purchase): Insert<ContactPurchase>,
    ) -> Result<Self::Ok, Self::Err> {
        let ContactPurchase {
            id,
            user_id,
            property_id,
            amount,
            payment_status,
            phone,
            payment_id,
            created_at,
        } = purchase;

        const SQL: &str = "\
            INSERT INTO contact_purchases (\
                id, user_id, property_id, amount, \
                payment_status, phone, payment_id, \
                created_at\
            ) VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::NUMERIC, \
                $5::VARCHAR, $6::VARCHAR, $7::UUID, \
                $8::TIMESTAMPTZ\
            ) \
            ON CONFLICT (user_id, property_id) DO NOTHING";
        self.exec(
            SQL,
            &[
                &id,
                &user_id,
                &property_id,
                &amount,
                &payment_status,
                &phone,
                &payment_id,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
