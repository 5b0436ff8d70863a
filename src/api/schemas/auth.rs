use serde::Serialize;

#[derive(Serialize)]
pub struct Login<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
pub struct Refresh<'a> {
    pub token: &'a str,
}
