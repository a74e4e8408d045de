pub mod labels;
pub mod recipes;
pub mod users;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{Id, Label, LabelKind, NewRecipe, NewUser, Recipe, RecipeChanges, User, UserChanges},
    store::{CatalogStore, Identity, UserStore},
};

/// PostgreSQL backed store; each trait method delegates to the query
/// functions in the submodules.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Connects and brings the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(QueryError::from)?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("Database schema is up to date");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        users::register_user(user, &self.pool).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        users::get_user(&self.pool, email).await
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, Error> {
        users::get_user_by_id(&self.pool, id).await
    }

    async fn update_user(&self, identity: &Identity, changes: UserChanges) -> Result<User, Error> {
        users::update_user(identity.user_id(), changes, &self.pool).await
    }

    async fn set_user_active(&self, email: &str, active: bool) -> Result<User, Error> {
        users::set_user_active(&self.pool, email, active).await
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_labels(&self, kind: LabelKind, identity: &Identity) -> Result<Vec<Label>, Error> {
        labels::list_labels(kind, identity.user_id(), &self.pool).await
    }

    async fn create_label(
        &self,
        kind: LabelKind,
        identity: &Identity,
        name: &str,
    ) -> Result<Label, Error> {
        labels::create_label(kind, identity.user_id(), name, &self.pool).await
    }

    async fn list_recipes(&self, identity: &Identity) -> Result<Vec<Recipe>, Error> {
        recipes::list_recipes(identity.user_id(), &self.pool).await
    }

    async fn get_recipe(&self, identity: &Identity, id: Id) -> Result<Recipe, Error> {
        recipes::get_recipe(identity.user_id(), id, &self.pool).await
    }

    async fn create_recipe(&self, identity: &Identity, recipe: NewRecipe) -> Result<Recipe, Error> {
        recipes::create_recipe(identity.user_id(), recipe, &self.pool).await
    }

    async fn update_recipe(
        &self,
        identity: &Identity,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Recipe, Error> {
        recipes::update_recipe(identity.user_id(), id, changes, &self.pool).await
    }

    async fn delete_recipe(&self, identity: &Identity, id: Id) -> Result<Recipe, Error> {
        recipes::delete_recipe(identity.user_id(), id, &self.pool).await
    }

    async fn set_recipe_image(
        &self,
        identity: &Identity,
        id: Id,
        image: &str,
    ) -> Result<Option<String>, Error> {
        recipes::set_recipe_image(identity.user_id(), id, image, &self.pool).await
    }
}

/// These run against the database named by `DATABASE_URL` and are skipped
/// when it is unset.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Price;

    async fn store() -> Option<PgStore> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL is not set; skipping PostgreSQL store test");
            return None;
        };
        Some(PgStore::connect(&url, 2).await.unwrap())
    }

    fn unique_email() -> String {
        format!("{}@example.com", uuid::Uuid::new_v4().simple())
    }

    async fn user(store: &PgStore) -> Identity {
        let user = store
            .create_user(NewUser {
                email: unique_email(),
                password_hash: String::from("hash"),
                name: String::new(),
            })
            .await
            .unwrap();
        Identity::new(user.id)
    }

    fn recipe(tags: Vec<Id>, ingredients: Vec<Id>) -> NewRecipe {
        NewRecipe {
            title: String::from("Dal"),
            time_minutes: 30,
            price: Price::from_cents(450),
            link: String::new(),
            tags,
            ingredients,
        }
    }

    fn ids(labels: &[Label]) -> Vec<Id> {
        let mut ids = labels.iter().map(|label| label.id).collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    #[tokio::test]
    async fn foreign_tag_is_rejected_and_nothing_persists() {
        let Some(store) = store().await else {
            return;
        };
        let owner = user(&store).await;
        let stranger = user(&store).await;
        let own = store.create_label(LabelKind::Tag, &owner, "Vegan").await.unwrap();
        let foreign = store
            .create_label(LabelKind::Tag, &stranger, "Spicy")
            .await
            .unwrap();

        let result = store
            .create_recipe(&owner, recipe(vec![own.id, foreign.id], vec![]))
            .await;

        assert!(matches!(result, Err(Error::Validation(ref errors)) if errors.contains("tag")));
        assert!(store.list_recipes(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_ingredient_is_rejected_on_update() {
        let Some(store) = store().await else {
            return;
        };
        let owner = user(&store).await;
        let stranger = user(&store).await;
        let created = store.create_recipe(&owner, recipe(vec![], vec![])).await.unwrap();
        let foreign = store
            .create_label(LabelKind::Ingredient, &stranger, "Salt")
            .await
            .unwrap();

        let result = store
            .update_recipe(
                &owner,
                created.id,
                RecipeChanges {
                    title: Some(String::from("Renamed")),
                    ingredients: Some(vec![foreign.id]),
                    ..Default::default()
                },
            )
            .await;

        assert!(
            matches!(result, Err(Error::Validation(ref errors)) if errors.contains("ingredient"))
        );
        let stored = store.get_recipe(&owner, created.id).await.unwrap();
        assert_eq!(stored.title, "Dal");
        assert!(stored.ingredients.is_empty());
    }

    #[tokio::test]
    async fn update_replaces_only_the_supplied_links() {
        let Some(store) = store().await else {
            return;
        };
        let owner = user(&store).await;
        let first = store.create_label(LabelKind::Tag, &owner, "Dinner").await.unwrap();
        let second = store.create_label(LabelKind::Tag, &owner, "Quick").await.unwrap();
        let lentils = store
            .create_label(LabelKind::Ingredient, &owner, "Lentils")
            .await
            .unwrap();
        let created = store
            .create_recipe(&owner, recipe(vec![first.id], vec![lentils.id]))
            .await
            .unwrap();

        let replaced = store
            .update_recipe(
                &owner,
                created.id,
                RecipeChanges {
                    tags: Some(vec![second.id, first.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(ids(&replaced.tags), ids(&[first.clone(), second.clone()]));
        assert_eq!(ids(&replaced.ingredients), vec![lentils.id]);

        let cleared = store
            .update_recipe(
                &owner,
                created.id,
                RecipeChanges {
                    tags: Some(vec![]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.tags.is_empty());
        let stored = store.get_recipe(&owner, created.id).await.unwrap();
        assert!(stored.tags.is_empty());
        assert_eq!(ids(&stored.ingredients), vec![lentils.id]);
    }

    #[tokio::test]
    async fn other_users_recipes_are_not_found() {
        let Some(store) = store().await else {
            return;
        };
        let owner = user(&store).await;
        let stranger = user(&store).await;
        let created = store.create_recipe(&owner, recipe(vec![], vec![])).await.unwrap();

        assert!(matches!(
            store.get_recipe(&stranger, created.id).await,
            Err(Error::NotFound)
        ));
        assert!(matches!(
            store
                .set_recipe_image(&stranger, created.id, "/media/uploads/recipe/x.png")
                .await,
            Err(Error::NotFound)
        ));
        assert!(matches!(
            store.delete_recipe(&stranger, created.id).await,
            Err(Error::NotFound)
        ));
        assert!(store.list_recipes(&stranger).await.unwrap().is_empty());
        assert!(store.get_recipe(&owner, created.id).await.is_ok());
    }

    #[tokio::test]
    async fn email_uniqueness_and_status_ignore_case() {
        let Some(store) = store().await else {
            return;
        };
        let email = unique_email();
        store
            .create_user(NewUser {
                email: email.clone(),
                password_hash: String::from("hash"),
                name: String::new(),
            })
            .await
            .unwrap();

        let duplicate = store
            .create_user(NewUser {
                email: email.to_uppercase(),
                password_hash: String::from("hash"),
                name: String::new(),
            })
            .await;
        assert!(matches!(duplicate, Err(Error::Conflict { field: "email", .. })));

        let deactivated = store
            .set_user_active(&email.to_uppercase(), false)
            .await
            .unwrap();
        assert!(!deactivated.is_active);
        let found = store.find_user_by_email(&email).await.unwrap().unwrap();
        assert!(!found.is_active);
        assert!(matches!(
            store.set_user_active(&unique_email(), false).await,
            Err(Error::NotFound)
        ));
    }
}
