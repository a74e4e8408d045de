use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    error::Error,
    schema::{
        Id, Label, LabelKind, NewRecipe, NewUser, Recipe, RecipeChanges, RecipeRow, User,
        UserChanges,
    },
    store::{invalid_reference, CatalogStore, Identity, UserStore},
};

/// Process-local store. Every operation runs under one lock, which gives
/// recipe writes the same all-or-nothing behaviour as a transaction.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Sequence(Id);

impl Sequence {
    fn next(&mut self) -> Id {
        self.0 += 1;
        self.0
    }
}

struct RecipeEntry {
    row: RecipeRow,
    tags: BTreeSet<Id>,
    ingredients: BTreeSet<Id>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<Id, User>,
    user_ids: Sequence,
    tags: BTreeMap<Id, Label>,
    tag_ids: Sequence,
    ingredients: BTreeMap<Id, Label>,
    ingredient_ids: Sequence,
    recipes: BTreeMap<Id, RecipeEntry>,
    recipe_ids: Sequence,
}

impl Tables {
    fn labels(&self, kind: LabelKind) -> &BTreeMap<Id, Label> {
        match kind {
            LabelKind::Tag => &self.tags,
            LabelKind::Ingredient => &self.ingredients,
        }
    }

    fn email_taken(&self, email: &str, except: Option<Id>) -> bool {
        let email = email.to_lowercase();
        self.users
            .values()
            .any(|user| Some(user.id) != except && user.email.to_lowercase() == email)
    }

    fn check_labels(&self, kind: LabelKind, owner: Id, ids: &[Id]) -> Result<(), Error> {
        let labels = self.labels(kind);
        match ids
            .iter()
            .find(|id| !labels.get(*id).is_some_and(|label| label.user_id == owner))
        {
            Some(id) => Err(invalid_reference(kind, *id)),
            None => Ok(()),
        }
    }

    fn check_changes(&self, owner: Id, changes: &RecipeChanges) -> Result<(), Error> {
        for kind in [LabelKind::Tag, LabelKind::Ingredient] {
            if let Some(ids) = changes.labels(kind) {
                self.check_labels(kind, owner, ids)?;
            }
        }
        Ok(())
    }

    fn owned_entry(&mut self, owner: Id, id: Id) -> Result<&mut RecipeEntry, Error> {
        self.recipes
            .get_mut(&id)
            .filter(|entry| entry.row.user_id == owner)
            .ok_or(Error::NotFound)
    }

    fn assemble(&self, entry: &RecipeEntry) -> Recipe {
        let collect = |kind: LabelKind, ids: &BTreeSet<Id>| {
            ids.iter()
                .filter_map(|id| self.labels(kind).get(id).cloned())
                .collect::<Vec<_>>()
        };

        Recipe::from_row(
            entry.row.clone(),
            collect(LabelKind::Tag, &entry.tags),
            collect(LabelKind::Ingredient, &entry.ingredients),
        )
    }
}

fn conflict() -> Error {
    Error::Conflict {
        field: "email",
        message: String::from("user with this email already exists."),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, Error> {
        let mut tables = self.tables.lock();
        if tables.email_taken(&user.email, None) {
            return Err(conflict());
        }

        let user = User {
            id: tables.user_ids.next(),
            email: user.email,
            password: user.password_hash,
            name: user.name,
            is_active: true,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let email = email.to_lowercase();
        let tables = self.tables.lock();

        Ok(tables
            .users
            .values()
            .find(|user| user.email.to_lowercase() == email)
            .cloned())
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, Error> {
        Ok(self.tables.lock().users.get(&id).cloned())
    }

    async fn update_user(&self, identity: &Identity, changes: UserChanges) -> Result<User, Error> {
        let mut tables = self.tables.lock();
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(identity.user_id())) {
                return Err(conflict());
            }
        }

        let user = tables
            .users
            .get_mut(&identity.user_id())
            .ok_or(Error::NotFound)?;
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password = password_hash;
        }

        Ok(user.clone())
    }

    async fn set_user_active(&self, email: &str, active: bool) -> Result<User, Error> {
        let email = email.to_lowercase();
        let mut tables = self.tables.lock();
        let user = tables
            .users
            .values_mut()
            .find(|user| user.email.to_lowercase() == email)
            .ok_or(Error::NotFound)?;
        user.is_active = active;

        Ok(user.clone())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_labels(&self, kind: LabelKind, identity: &Identity) -> Result<Vec<Label>, Error> {
        let tables = self.tables.lock();
        let mut labels = tables
            .labels(kind)
            .values()
            .filter(|label| label.user_id == identity.user_id())
            .cloned()
            .collect::<Vec<_>>();
        labels.sort_by(|a, b| b.name.cmp(&a.name).then(b.id.cmp(&a.id)));

        Ok(labels)
    }

    async fn create_label(
        &self,
        kind: LabelKind,
        identity: &Identity,
        name: &str,
    ) -> Result<Label, Error> {
        let mut tables = self.tables.lock();
        let id = match kind {
            LabelKind::Tag => tables.tag_ids.next(),
            LabelKind::Ingredient => tables.ingredient_ids.next(),
        };
        let label = Label {
            id,
            user_id: identity.user_id(),
            name: name.to_owned(),
        };

        match kind {
            LabelKind::Tag => tables.tags.insert(id, label.clone()),
            LabelKind::Ingredient => tables.ingredients.insert(id, label.clone()),
        };

        Ok(label)
    }

    async fn list_recipes(&self, identity: &Identity) -> Result<Vec<Recipe>, Error> {
        let tables = self.tables.lock();

        Ok(tables
            .recipes
            .values()
            .rev()
            .filter(|entry| entry.row.user_id == identity.user_id())
            .map(|entry| tables.assemble(entry))
            .collect())
    }

    async fn get_recipe(&self, identity: &Identity, id: Id) -> Result<Recipe, Error> {
        let tables = self.tables.lock();
        tables
            .recipes
            .get(&id)
            .filter(|entry| entry.row.user_id == identity.user_id())
            .map(|entry| tables.assemble(entry))
            .ok_or(Error::NotFound)
    }

    async fn create_recipe(&self, identity: &Identity, recipe: NewRecipe) -> Result<Recipe, Error> {
        let owner = identity.user_id();
        let mut tables = self.tables.lock();
        tables.check_labels(LabelKind::Tag, owner, &recipe.tags)?;
        tables.check_labels(LabelKind::Ingredient, owner, &recipe.ingredients)?;

        let entry = RecipeEntry {
            row: RecipeRow {
                id: tables.recipe_ids.next(),
                user_id: owner,
                title: recipe.title,
                time_minutes: recipe.time_minutes,
                price: recipe.price,
                link: recipe.link,
                image: None,
            },
            tags: recipe.tags.into_iter().collect(),
            ingredients: recipe.ingredients.into_iter().collect(),
        };
        let created = tables.assemble(&entry);
        tables.recipes.insert(entry.row.id, entry);

        Ok(created)
    }

    async fn update_recipe(
        &self,
        identity: &Identity,
        id: Id,
        changes: RecipeChanges,
    ) -> Result<Recipe, Error> {
        let owner = identity.user_id();
        let mut tables = self.tables.lock();
        tables.owned_entry(owner, id)?;
        tables.check_changes(owner, &changes)?;

        let entry = tables.owned_entry(owner, id)?;
        changes.apply(&mut entry.row);
        if let Some(tags) = changes.tags {
            entry.tags = tags.into_iter().collect();
        }
        if let Some(ingredients) = changes.ingredients {
            entry.ingredients = ingredients.into_iter().collect();
        }

        let entry = tables.recipes.get(&id).ok_or(Error::NotFound)?;
        Ok(tables.assemble(entry))
    }

    async fn delete_recipe(&self, identity: &Identity, id: Id) -> Result<Recipe, Error> {
        let mut tables = self.tables.lock();
        tables.owned_entry(identity.user_id(), id)?;

        let entry = tables.recipes.remove(&id).ok_or(Error::NotFound)?;
        Ok(tables.assemble(&entry))
    }

    async fn set_recipe_image(
        &self,
        identity: &Identity,
        id: Id,
        image: &str,
    ) -> Result<Option<String>, Error> {
        let mut tables = self.tables.lock();
        let entry = tables.owned_entry(identity.user_id(), id)?;

        Ok(entry.row.image.replace(image.to_owned()))
    }
}
