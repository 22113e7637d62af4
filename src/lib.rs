//! Mycelial FunGuy: a server-rendered site for blog posts and cultivation
//! tutorials backed by a hosted headless CMS.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
