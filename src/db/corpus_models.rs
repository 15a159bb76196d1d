use diesel::prelude::*;

use crate::db::corpus_schema::*;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = translations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Translation {
    pub id: i32,
    pub uid: String,
    pub name: String,
    pub name_canonical: String,
    pub language: String,
    pub size_bytes: i64,
    pub verse_count: i32,
    pub origin: String,
}

#[derive(Insertable)]
#[diesel(table_name = translations)]
pub struct NewTranslation<'a> {
    pub uid: &'a str,
    pub name: &'a str,
    pub name_canonical: &'a str,
    pub language: &'a str,
    pub size_bytes: i64,
    pub verse_count: i32,
    pub origin: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = books)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Book {
    pub id: i32,
    pub code: String,
    pub testament: String,
    pub chapter_count: i32,
}

#[derive(Insertable)]
#[diesel(table_name = books)]
pub struct NewBook<'a> {
    pub id: i32,
    pub code: &'a str,
    pub testament: &'a str,
    pub chapter_count: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq, Associations)]
#[diesel(belongs_to(Book))]
#[diesel(table_name = book_names)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BookName {
    pub id: i32,
    pub book_id: i32,
    pub language: String,
    pub name: String,
    pub abbreviation: String,
}

#[derive(Insertable)]
#[diesel(table_name = book_names)]
pub struct NewBookName<'a> {
    pub book_id: i32,
    pub language: &'a str,
    pub name: &'a str,
    pub abbreviation: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq, QueryableByName)]
#[diesel(table_name = verses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Verse {
    pub id: i32,
    pub translation_uid: String,
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub content: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = verses)]
pub struct NewVerse {
    pub translation_uid: String,
    pub book_id: i32,
    pub chapter: i32,
    pub verse: i32,
    pub content: String,
}
