//! The signed-in user's own profile, and public profiles of others.

use serde::{Deserialize, Serialize};

use super::{validate, ServiceContext, ServiceError, ServiceResult};
use crate::images::store_image_async;
use crate::models::{AccountView, PublicUser, Review, User};

/// Reviews shown on a public profile.
const PROFILE_REVIEWS: i64 = 10;

/// Partial profile edit; absent fields are left unchanged. Blank text
/// clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default)]
    pub clear_location: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    #[serde(flatten)]
    pub user: PublicUser,
    pub reviews: Vec<Review>,
}

pub struct ProfileService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ProfileService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn update_me(&self, user: &User, input: UpdateProfile) -> ServiceResult<AccountView> {
        let mut updated = user.clone();

        if let Some(name) = input.name {
            updated.name = validate::text("name", &name, validate::NAME_LEN)?;
        }
        if let Some(bio) = input.bio {
            updated.bio = validate::optional_text("bio", Some(&bio), validate::BIO_MAX)?;
        }
        if let Some(skills) = input.skills {
            updated.skills = validate::skills(&skills)?;
        }
        if let Some(city) = input.city {
            updated.city = validate::optional_text("city", Some(&city), validate::CITY_MAX)?;
        }
        if input.clear_location {
            updated.location = None;
        } else if let Some(location) = validate::location(input.lat, input.lng)? {
            self.ctx.geofence().check(location)?;
            updated.location = Some(location);
        }

        self.ctx.db.users().update_profile(&updated).await?;
        Ok(AccountView::from(&updated))
    }

    pub async fn set_avatar(&self, user: &User, bytes: Vec<u8>) -> ServiceResult<AccountView> {
        let settings = &self.ctx.settings;
        let stored = store_image_async(
            bytes,
            settings.uploads_dir.clone(),
            settings.image_max_dimension,
            settings.max_upload_bytes,
        )
        .await?;

        let mut updated = user.clone();
        updated.avatar_url = Some(stored.url);
        self.ctx.db.users().update_profile(&updated).await?;
        Ok(AccountView::from(&updated))
    }

    /// Banned accounts are hidden.
    pub async fn get_public(&self, id: &str) -> ServiceResult<PublicProfile> {
        let user = self
            .ctx
            .db
            .users()
            .get(id)
            .await?
            .filter(|u| !u.banned)
            .ok_or(ServiceError::NotFound("user"))?;
        let reviews = self
            .ctx
            .db
            .reviews()
            .list_for_user(&user.id, PROFILE_REVIEWS, 0)
            .await?;

        Ok(PublicProfile {
            user: user.to_public(),
            reviews,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoError;
    use crate::services::test_support::{test_services, user};

    #[tokio::test]
    async fn test_update_me() {
        let (ctx, _dir) = test_services().await;
        let ana = user(&ctx, "Ana").await;
        let profiles = ctx.profiles();

        let view = profiles
            .update_me(
                &ana,
                UpdateProfile {
                    bio: Some(" Retired nurse ".into()),
                    skills: Some(vec!["first aid".into(), "First Aid".into(), "cooking".into()]),
                    city: Some("Agudo".into()),
                    lat: Some(-29.64),
                    lng: Some(-53.25),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(view.public.bio.as_deref(), Some("Retired nurse"));
        assert_eq!(view.public.skills, vec!["first aid", "cooking"]);
        assert!(view.location.is_some());

        let stored = ctx.db.users().get(&ana.id).await.unwrap().unwrap();
        assert_eq!(stored.city.as_deref(), Some("Agudo"));
        assert_eq!(stored.name, "Ana");

        assert!(matches!(
            profiles
                .update_me(
                    &stored,
                    UpdateProfile {
                        lat: Some(-30.0346),
                        lng: Some(-51.2177),
                        ..Default::default()
                    },
                )
                .await,
            Err(ServiceError::Geo(GeoError::OutsideArea { .. }))
        ));

        let cleared = profiles
            .update_me(
                &stored,
                UpdateProfile {
                    bio: Some("".into()),
                    clear_location: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.public.bio.is_none());
        assert!(cleared.location.is_none());
    }

    #[tokio::test]
    async fn test_get_public_hides_banned() {
        let (ctx, _dir) = test_services().await;
        let ana = user(&ctx, "Ana").await;

        let profile = ctx.profiles().get_public(&ana.id).await.unwrap();
        assert_eq!(profile.user.name, "Ana");
        assert!(profile.reviews.is_empty());
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("email").is_none());

        ctx.db.users().set_banned(&ana.id, true).await.unwrap();
        assert!(matches!(
            ctx.profiles().get_public(&ana.id).await,
            Err(ServiceError::NotFound("user"))
        ));
    }

    #[tokio::test]
    async fn test_set_avatar() {
        use image::{DynamicImage, ImageFormat, RgbImage};
        use std::io::Cursor;

        let (ctx, _dir) = test_services().await;
        let ana = user(&ctx, "Ana").await;

        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(16, 16))
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();

        let view = ctx.profiles().set_avatar(&ana, png.into_inner()).await.unwrap();
        let url = view.public.avatar_url.unwrap();
        assert!(url.starts_with("/uploads/"));

        let stored = ctx.db.users().get(&ana.id).await.unwrap().unwrap();
        assert_eq!(stored.avatar_url.as_deref(), Some(url.as_str()));
    }
}
