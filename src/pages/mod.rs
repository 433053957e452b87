//! Páginas HTML (askama) servidas pelo próprio serviço: login, painel admin
//! e a tela pública de pedidos.

pub mod admin;
pub mod auth;
pub mod display;

use actix_web::{http::header, HttpResponse};

pub(crate) fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

/// 303 so a form POST is followed by a GET and leaves no history entry.
pub(crate) fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.to_string()))
        .finish()
}
