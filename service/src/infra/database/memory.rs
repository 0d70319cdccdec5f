//! In-memory [`Database`] used in tests.
//!
//! Never fails, but reports [`database::Error`]s to be usable wherever the
//! `Postgres` one is.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use common::operations::{
    By, Commit, Delete, Insert, Lock, Select, Transact, Update,
};
use tracerr::Traced;

use crate::{
    domain::{
        payment, profile, property, purchase, ContactPurchase, Payment,
        Profile, Property,
    },
    infra::{database, Database},
    read,
};

/// In-memory [`Database`] keeping everything in [`HashMap`]s.
///
/// Transactions share the state with their origin and are never rolled back.
#[derive(Clone, Debug, Default)]
pub struct Memory(Arc<Mutex<State>>);

/// State of a [`Memory`] database.
#[derive(Debug, Default)]
pub struct State {
    /// Stored [`Property`]s.
    pub properties: HashMap<property::Id, Property>,

    /// Stored [`Profile`]s.
    pub profiles: HashMap<profile::Id, Profile>,

    /// Stored [`ContactPurchase`]s.
    pub purchases: HashMap<purchase::Key, ContactPurchase>,

    /// Stored [`Payment`]s.
    pub payments: HashMap<payment::Id, Payment>,
}

impl Memory {
    /// Returns the [`State`] of this [`Memory`] database.
    #[expect(clippy::missing_panics_doc, reason = "test only")]
    pub fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap()
    }
}

/// Sorts the provided items newest first.
fn newest_first<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items
}

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Select<By<Option<Property>, property::Id>>> for Memory {
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Property>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state().properties.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Vec<Property>, read::property::list::Selector>>>
    for Memory
{
    type Ok = Vec<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Property>, read::property::list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        use read::property::list::Selector;

        let selector = by.into_inner();
        let all = self.state().properties.values().cloned().collect();
        let mut list = newest_first(all, |p: &Property| p.created_at)
            .into_iter()
            .filter(|p| match &selector {
                Selector::Catalog { filter, .. } => {
                    p.status == property::Status::Available
                        && filter.matches(p)
                }
                Selector::OwnedBy(id) => p.landlord_id == *id,
                Selector::All => true,
            })
            .collect::<Vec<_>>();
        if let Selector::Catalog {
            limit: Some(limit), ..
        } = selector
        {
            list.truncate(limit);
        }
        Ok(list)
    }
}

impl Database<Insert<Property>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(property): Insert<Property>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(property)).await
    }
}

impl Database<Update<Property>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(property): Update<Property>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self.state().properties.insert(property.id, property);
        Ok(())
    }
}

impl Database<Delete<By<Property, property::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self.state().properties.remove(&by.into_inner());
        Ok(())
    }
}

impl Database<Lock<By<Property, property::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Select<By<Option<Profile>, profile::Id>>> for Memory {
    type Ok = Option<Profile>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Profile>, profile::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state().profiles.get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Vec<Profile>, read::profile::list::All>>> for Memory {
    type Ok = Vec<Profile>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Profile>, read::profile::list::All>>,
    ) -> Result<Self::Ok, Self::Err> {
        let all = self.state().profiles.values().cloned().collect();
        Ok(newest_first(all, |p: &Profile| p.created_at))
    }
}

impl Database<Update<Profile>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(profile): Update<Profile>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self.state().profiles.insert(profile.id, profile);
        Ok(())
    }
}

impl Database<Lock<By<Profile, profile::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Profile, profile::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Select<By<read::purchase::IsPurchased, purchase::Key>>>
    for Memory
{
    type Ok = read::purchase::IsPurchased;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::purchase::IsPurchased, purchase::Key>>,
    ) -> Result<Self::Ok, Self::Err> {
        let key = by.into_inner();
        Ok(read::purchase::IsPurchased(
            self.state().purchases.contains_key(&key),
        ))
    }
}

impl Database<Select<By<Vec<read::purchase::Listed>, ()>>> for Memory {
    type Ok = Vec<read::purchase::Listed>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<read::purchase::Listed>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        let state = self.state();
        let all = state.purchases.values().cloned().collect();
        Ok(newest_first(all, |p: &ContactPurchase| p.created_at)
            .into_iter()
            .map(|purchase| read::purchase::Listed {
                property_title: state
                    .properties
                    .get(&purchase.property_id)
                    .map(|p| p.title.clone()),
                buyer_name: state
                    .profiles
                    .get(&purchase.user_id)
                    .and_then(|p| p.full_name.clone()),
                purchase,
            })
            .collect())
    }
}

impl Database<Insert<ContactPurchase>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(purchase): Insert<ContactPurchase>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self
            .state()
            .purchases
            .entry(purchase.key())
            .or_insert(purchase);
        Ok(())
    }
}

impl Database<Select<By<Option<Payment>, payment::Id>>> for Memory {
    type Ok = Option<Payment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Payment>, payment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.state().payments.get(&by.into_inner()).cloned())
    }
}

impl Database<Insert<Payment>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(payment): Insert<Payment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(payment)).await
    }
}

impl Database<Update<Payment>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(payment): Update<Payment>,
    ) -> Result<Self::Ok, Self::Err> {
        _ = self.state().payments.insert(payment.id, payment);
        Ok(())
    }
}

impl Database<Lock<By<Payment, payment::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Payment, payment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(())
    }
}

impl Database<Update<By<read::payment::Stale, payment::CreationDateTime>>>
    for Memory
{
    type Ok = read::payment::Affected;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(by): Update<By<read::payment::Stale, payment::CreationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();
        let expired = self
            .state()
            .payments
            .values_mut()
            .filter(|p| p.created_at < deadline)
            .map(Payment::expire)
            .filter(|expired| *expired)
            .count();
        Ok(read::payment::Affected(expired as u64))
    }
}

impl Database<Select<By<read::dashboard::Stats, ()>>> for Memory {
    type Ok = read::dashboard::Stats;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<read::dashboard::Stats, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        let state = self.state();
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        Ok(read::dashboard::Stats {
            total_properties: count(state.properties.len()),
            total_profiles: count(state.profiles.len()),
            total_revenue: state.purchases.values().map(|p| p.amount).sum(),
            pending_approval: count(
                state
                    .properties
                    .values()
                    .filter(|p| p.status == property::Status::PendingApproval)
                    .count(),
            ),
        })
    }
}
