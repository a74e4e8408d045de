use async_trait::async_trait;

use crate::{
    error::Error,
    schema::{Id, Label, LabelKind, NewRecipe, NewUser, Recipe, RecipeChanges, User, UserChanges},
};

/// The authenticated caller every catalog operation is scoped to.
///
/// Only the token authenticator and account registration mint identities,
/// so catalog access without an authenticated owner is not expressible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity {
    user_id: Id,
}

impl Identity {
    pub(crate) fn new(user_id: Id) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> Id {
        self.user_id
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Error::Conflict` when the email is taken, ignoring case.
    async fn create_user(&self, user: NewUser) -> Result<User, Error>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    async fn get_user(&self, id: Id) -> Result<Option<User>, Error>;

    async fn update_user(&self, identity: &Identity, changes: UserChanges) -> Result<User, Error>;

    /// Inactive users can neither log in nor use tokens issued earlier.
    async fn set_user_active(&self, email: &str, active: bool) -> Result<User, Error>;
}

/// Owner-scoped access to tags, ingredients and recipes.
///
/// Entities owned by someone other than `identity` behave exactly as if they
/// did not exist: reads and writes fail with `Error::NotFound`, lists omit
/// them and references to them are rejected as invalid input.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Ordered by name descending, then id descending.
    async fn list_labels(&self, kind: LabelKind, identity: &Identity) -> Result<Vec<Label>, Error>;

    async fn create_label(
        &self,
        kind: LabelKind,
        identity: &Identity,
        name: &str,
    ) -> Result<Label, Error>;

    /// Newest first.
    async fn list_recipes(&self, identity: &Identity) -> Result<Vec<Recipe>, Error>;

    async fn get_recipe(&self, identity: &Identity, id: Id) -> Result<Recipe, Error>;

    /// The recipe and its links persist together or not at all.
    async fn create_recipe(&self, identity: &Identity, recipe: NewRecipe) -> Result<Recipe, Error>;

    async fn update_recipe(
        &self,
        identity: &Identity,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Recipe, Error>;

    async fn delete_recipe(&self, identity: &Identity, id: Id) -> Result<Recipe, Error>;

    /// Returns the image reference that was replaced, if any.
    async fn set_recipe_image(
        &self,
        identity: &Identity,
        id: Id,
        image: &str,
    ) -> Result<Option<String>, Error>;
}

pub(crate) fn invalid_reference(kind: LabelKind, id: Id) -> Error {
    Error::validation(
        kind.field(),
        format!("Invalid pk \"{id}\" - object does not exist."),
    )
}
