/// Row types that differ from the public API models in vidtube-types.
/// Everything else is read straight into the API models.
use vidtube_types::models::User;

/// Input for a new account. `password_hash` must already be a PHC string;
/// this layer never sees a plaintext password.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: &'a str,
    pub avatar: &'a str,
    pub cover_image: Option<&'a str>,
    pub password_hash: &'a str,
}

/// A user together with the stored hash, for login and password change.
pub struct CredentialsRow {
    pub user: User,
    pub password_hash: String,
}
