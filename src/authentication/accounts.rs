use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::TokenIssuer,
    },
    error::{Error, NON_FIELD_ERRORS},
    form::{ProfileForm, RegisterForm, TokenForm},
    schema::{NewUser, User, UserChanges},
    store::{Identity, UserStore},
};

const INVALID_CREDENTIALS: &str = "Unable to authenticate with provided credentials";

/// Verified against when the email is unknown so that lookups for missing
/// accounts cost the same argon2 work as a wrong password.
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$tpnxBe/IH9U5n1gyYBPopw$NzPnVLpwUTYtZWwqdG7Mvq9DOPQvzCd+9GGB1N+trqE";

fn invalid_credentials() -> Error {
    Error::validation(NON_FIELD_ERRORS, INVALID_CREDENTIALS)
}

pub async fn register(users: &dyn UserStore, form: RegisterForm) -> Result<User, Error> {
    let user = users
        .create_user(NewUser {
            email: form.email,
            password_hash: hash_password(&form.password)?,
            name: form.name,
        })
        .await?;

    log::info!("Registered user {}", user.id);
    Ok(user)
}

/// Every failure produces the same error so callers cannot probe for
/// registered emails.
pub async fn login(
    users: &dyn UserStore,
    tokens: &TokenIssuer,
    form: TokenForm,
) -> Result<String, Error> {
    let (Some(email), Some(password)) = (form.email, form.password) else {
        return Err(invalid_credentials());
    };

    let user = match users.find_user_by_email(&email).await? {
        Some(user) => user,
        None => {
            verify_password(&password, DUMMY_PASSWORD_HASH);
            return Err(invalid_credentials());
        }
    };
    if !user.is_active || !verify_password(&password, &user.password) {
        return Err(invalid_credentials());
    }

    tokens.issue(&user)
}

pub async fn profile(users: &dyn UserStore, identity: &Identity) -> Result<User, Error> {
    users
        .get_user(identity.user_id())
        .await?
        .ok_or(Error::NotFound)
}

pub async fn update_profile(
    users: &dyn UserStore,
    identity: &Identity,
    form: ProfileForm,
) -> Result<User, Error> {
    let password_hash = match form.password {
        Some(password) => Some(hash_password(&password)?),
        None => None,
    };

    users
        .update_user(
            identity,
            UserChanges {
                email: form.email,
                name: form.name,
                password_hash,
            },
        )
        .await
}

pub async fn set_active(users: &dyn UserStore, email: &str, active: bool) -> Result<User, Error> {
    let user = users.set_user_active(email, active).await?;
    if active {
        log::info!("Activated user {}", user.id);
    } else {
        log::info!("Deactivated user {}", user.id);
    }

    Ok(user)
}
