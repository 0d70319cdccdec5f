//! Dashboard-related [`Database`] implementations.

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::property,
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

impl<C> Database<Select<By<read::dashboard::Stats, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::dashboard::Stats;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<read::dashboard::Stats, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT (SELECT COUNT(*) FROM properties) AS total_properties, \
                   (SELECT COUNT(*) FROM profiles) AS total_profiles, \
                   (SELECT COALESCE(SUM(amount), 0) \
                    FROM contact_purchases) AS total_revenue, \
                   (SELECT COUNT(*) \
                    FROM properties \
                    WHERE status = $1::VARCHAR) AS pending_approval";
        let row = self
            .query_opt(SQL, &[&property::Status::PendingApproval])
            .await
            .map_err(tracerr::wrap!())?
            .ok_or_else(|| {
                tracerr::new!(database::Error::NoRows("dashboard statistics"))
            })?;

        Ok(read::dashboard::Stats {
            total_properties: row.get("total_properties"),
            total_profiles: row.get("total_profiles"),
            total_revenue: row.get("total_revenue"),
            pending_approval: row.get("pending_approval"),
        })
    }
}
