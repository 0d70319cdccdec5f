//! [`Query`] collection related to a single [`Property`].

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    command::role_of,
    domain::{profile, property, purchase, Profile, Property},
    infra::{database, Database},
    read, Service,
};

use super::{DatabaseQuery, Query};

/// Queries a [`Property`] by its [`property::Id`], regardless of who's asking.
pub type ById = DatabaseQuery<By<Option<Property>, property::Id>>;

/// Queries a [`Property`] by its [`property::Id`], as long as it's visible to
/// the viewer.
///
/// [`property::Status::Available`] [`Property`]s are visible to everyone,
/// while the rest only to their landlords and moderators.
#[derive(Clone, Copy, Debug)]
pub struct Visible {
    /// ID of the user viewing the [`Property`], if authenticated.
    pub viewer_id: Option<profile::Id>,

    /// ID of the [`Property`] to view.
    pub property_id: property::Id,
}

impl<Db, St, Gw> Query<Visible> for Service<Db, St, Gw>
where
    Db: Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Profile>, profile::Id>>,
            Ok = Option<Profile>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(&self, query: Visible) -> Result<Self::Ok, Self::Err> {
        let Visible {
            viewer_id,
            property_id,
        } = query;

        let Some(property) = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };
        if property.status == property::Status::Available {
            return Ok(Some(property));
        }

        let Some(viewer_id) = viewer_id else {
            return Ok(None);
        };
        if property.is_owned_by(viewer_id)
            || role_of(self.database(), viewer_id)
                .await
                .map_err(tracerr::wrap!())?
                .can(profile::Capability::ModerateListings)
        {
            return Ok(Some(property));
        }
        Ok(None)
    }
}

/// Queries the landlord [`read::property::Contact`] of a [`Property`], as long
/// as the viewer is allowed to see it.
///
/// Allowed viewers are the landlord, admins, and users having a
/// [`ContactPurchase`] for exactly this [`Property`].
///
/// [`ContactPurchase`]: crate::domain::ContactPurchase
#[derive(Clone, Copy, Debug)]
pub struct Contact {
    /// ID of the user viewing the [`read::property::Contact`], if
    /// authenticated.
    pub viewer_id: Option<profile::Id>,

    /// ID of the [`Property`] to view the [`read::property::Contact`] of.
    pub property_id: property::Id,

    /// ID of the [`Property`] landlord.
    pub landlord_id: profile::Id,
}

impl<Db, St, Gw> Query<Contact> for Service<Db, St, Gw>
where
    Db: Database<
            Select<By<Option<Profile>, profile::Id>>,
            Ok = Option<Profile>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::purchase::IsPurchased, purchase::Key>>,
            Ok = read::purchase::IsPurchased,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Option<read::property::Contact>;
    type Err = Traced<database::Error>;

    async fn execute(&self, query: Contact) -> Result<Self::Ok, Self::Err> {
        let Contact {
            viewer_id,
            property_id,
            landlord_id,
        } = query;

        let Some(viewer_id) = viewer_id else {
            return Ok(None);
        };
        let allowed = viewer_id == landlord_id
            || role_of(self.database(), viewer_id)
                .await
                .map_err(tracerr::wrap!())?
                .can(profile::Capability::ModerateListings)
            || self
                .database()
                .execute(Select(By::new(purchase::Key {
                    user_id: viewer_id,
                    property_id,
                })))
                .await
                .map_err(tracerr::wrap!())?
                .0;
        if !allowed {
            return Ok(None);
        }

        let landlord = self
            .database()
            .execute(Select(By::<Option<Profile>, _>::new(landlord_id)))
            .await
            .map_err(tracerr::wrap!())?;
        Ok(Some(landlord.map_or_else(Default::default, |p| {
            read::property::Contact {
                phone: p.phone,
                email: p.email,
            }
        })))
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        command::test::{profile, property},
        domain::{
            profile::{Email, Phone, Role},
            property::Status,
            purchase, ContactPurchase,
        },
        test::{service, TestService},
        Query as _,
    };

    use super::{Contact, Visible};

    fn buy(svc: &TestService, key: purchase::Key) {
        let purchase = ContactPurchase::completed(
            key,
            svc.config().contact_price,
            None,
            None,
        );
        _ = svc.database().state().purchases.insert(key, purchase);
    }

    #[tokio::test]
    async fn hides_unlisted_from_strangers() {
        let svc = service(false);
        let landlord = profile(&svc, Role::Landlord);
        let tenant = profile(&svc, Role::Tenant);
        let admin = profile(&svc, Role::Admin);
        let pending = property(&svc, landlord.id, Status::PendingApproval);
        let available = property(&svc, landlord.id, Status::Available);

        let visible = |viewer_id, property_id| {
            svc.execute(Visible {
                viewer_id,
                property_id,
            })
        };

        assert!(visible(None, available.id).await.unwrap().is_some());
        assert!(visible(None, pending.id).await.unwrap().is_none());
        assert!(visible(Some(tenant.id), pending.id).await.unwrap().is_none());
        assert!(visible(Some(landlord.id), pending.id).await.unwrap().is_some());
        assert!(visible(Some(admin.id), pending.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn reveals_contact_only_to_exact_purchaser() {
        let svc = service(false);
        let mut landlord = profile(&svc, Role::Landlord);
        landlord.phone = Phone::new("0712345678");
        landlord.email = Email::new("landlord@rently.co.ke");
        _ = svc
            .database()
            .state()
            .profiles
            .insert(landlord.id, landlord.clone());
        let tenant = profile(&svc, Role::Tenant);
        let first = property(&svc, landlord.id, Status::Available);
        let second = property(&svc, landlord.id, Status::Available);
        buy(
            &svc,
            purchase::Key {
                user_id: tenant.id,
                property_id: first.id,
            },
        );

        let contact = |viewer_id, property_id| {
            svc.execute(Contact {
                viewer_id,
                property_id,
                landlord_id: landlord.id,
            })
        };

        let unlocked = contact(Some(tenant.id), first.id).await.unwrap().unwrap();
        assert_eq!(unlocked.phone.unwrap().to_string(), "0712345678");
        assert_eq!(
            unlocked.email.unwrap().to_string(),
            "landlord@rently.co.ke",
        );
        assert!(contact(Some(tenant.id), second.id).await.unwrap().is_none());
        assert!(contact(None, first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reveals_contact_to_landlord_and_admin() {
        let svc = service(false);
        let landlord = profile(&svc, Role::Landlord);
        let admin = profile(&svc, Role::Admin);
        let other = profile(&svc, Role::Landlord);
        let listed = property(&svc, landlord.id, Status::Available);

        let contact = |viewer_id| {
            svc.execute(Contact {
                viewer_id: Some(viewer_id),
                property_id: listed.id,
                landlord_id: landlord.id,
            })
        };

        assert!(contact(landlord.id).await.unwrap().is_some());
        assert!(contact(admin.id).await.unwrap().is_some());
        assert!(contact(other.id).await.unwrap().is_none());
    }
}
