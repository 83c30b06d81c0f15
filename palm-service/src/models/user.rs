//! User accounts. Analyses may reference an owner, but no HTTP route creates
//! or reads users yet; guest analyses are the only supported path.

/// A registered user. Deliberately not `Serialize`: the password must never
/// reach a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}
