//! [`Payment`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{payment, Payment},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

impl<C> Database<Select<By<Option<Payment>, payment::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Payment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Payment>, payment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: payment::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, user_id, property_id, phone, amount, status, \
                   merchant_request_id, checkout_request_id, \
                   result_code, result_description, receipt, \
                   created_at, settled_at \
            FROM payments \
            WHERE id = $1::UUID";
        let Some(row) = self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        Ok(Some(Payment {
            id: row.get("id"),
            user_id: row.get("user_id"),
            property_id: row.get("property_id"),
            phone: row.get("phone"),
            amount: row.get("amount"),
            status: row.get("status"),
            merchant_request_id: row.get("merchant_request_id"),
            checkout_request_id: row.get("checkout_request_id"),
            result_code: row.get("result_code"),
            result_description: row.get("result_description"),
            receipt: row.get("receipt"),
            created_at: row.get("created_at"),
            settled_at: row.get("settled_at"),
        }))
    }
}

impl<C> Database<Insert<Payment>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Payment>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(payment): Insert<Payment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(payment)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Payment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(payment): Update<Payment>,
    ) -> Result<Self::Ok, Self::Err> {
        let Payment {
            id,
            user_id,
            property_id,
            phone,
            amount,
            status,
            merchant_request_id,
            checkout_request_id,
            result_code,
            result_description,
            receipt,
            created_at,
            settled_at,
        } = payment;

        const SQL: &str = "\
            INSERT INTO payments (\
                id, user_id, property_id, phone, amount, status, \
                merchant_request_id, checkout_request_id, \
                result_code, result_description, receipt, \
                created_at, settled_at\
            ) VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::VARCHAR, $5::NUMERIC, \
                $6::VARCHAR, \
                $7::VARCHAR, $8::VARCHAR, \
                $9::INT4, $10::TEXT, $11::VARCHAR, \
                $12::TIMESTAMPTZ, $13::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                merchant_request_id = EXCLUDED.merchant_request_id, \
                checkout_request_id = EXCLUDED.checkout_request_id, \
                result_code = EXCLUDED.result_code, \
                result_description = EXCLUDED.result_description, \
                receipt = EXCLUDED.receipt, \
                settled_at = EXCLUDED.settled_at";
        self.exec(
            SQL,
            &[
                &id,
                &user_id,
                &property_id,
                &phone,
                &amount,
                &status,
                &merchant_request_id,
                &checkout_request_id,
                &result_code,
                &result_description,
                &receipt,
                &created_at,
                &settled_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Payment, payment::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Payment, payment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: payment::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM payments \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<By<read::payment::Stale, payment::CreationDateTime>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::payment::Affected;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(by): Update<By<read::payment::Stale, payment::CreationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline: payment::CreationDateTime = by.into_inner();

        const SQL: &str = "\
            UPDATE payments \
            SET status = $1::VARCHAR, \
                settled_at = NOW() \
            WHERE status = $2::VARCHAR \
              AND created_at < $3::TIMESTAMPTZ";
        self.exec(
            SQL,
            &[
                &payment::Status::Expired,
                &payment::Status::AwaitingCallback,
                &deadline,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(read::payment::Affected)
    }
}
