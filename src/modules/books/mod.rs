pub mod models;
pub mod routes;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Value};
use shelf_catalog::{sample::sample_books, Book, Library, MemoryStore};
use shelf_kernel::settings::CatalogSettings;
use shelf_kernel::{InitCtx, Module};

use routes::BooksState;

/// Books module: owns the catalog and exposes it over HTTP
pub struct BooksModule {
    library: Arc<Library>,
    catalog: CatalogSettings,
}

impl BooksModule {
    pub fn new(library: Arc<Library>, catalog: CatalogSettings) -> Self {
        Self { library, catalog }
    }

    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let books = seed_books(&ctx.settings.catalog)?;
        let seeded = self
            .library
            .seed(books)
            .await
            .context("seed data violates catalog rules")?;

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            library = %self.library.name(),
            seeded,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(BooksState {
            library: Arc::clone(&self.library),
            recent_limit: self.catalog.recent_limit,
            top_limit: self.catalog.top_limit,
        })
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_spec())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let stats = self.library.get_stats().await;
        tracing::info!(
            module = self.name(),
            total = stats.total,
            borrowed = stats.borrowed,
            "books module started"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Records the catalog starts with: the demo books when enabled, then the
/// contents of the configured seed file.
pub fn seed_books(catalog: &CatalogSettings) -> anyhow::Result<Vec<Book>> {
    let mut books = if catalog.sample_data {
        sample_books()
    } else {
        Vec::new()
    };

    if let Some(path) = &catalog.seed_path {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        let seeded: Vec<Book> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse seed file {}", path.display()))?;
        books.extend(seeded);
    }

    Ok(books)
}

/// Build a seeded library outside the module lifecycle (CLI commands)
pub async fn open_library(catalog: &CatalogSettings) -> anyhow::Result<Arc<Library>> {
    let library = Arc::new(Library::new(catalog.name.clone(), Arc::new(MemoryStore)));
    library
        .seed(seed_books(catalog)?)
        .await
        .context("seed data violates catalog rules")?;
    Ok(library)
}

/// Create a new instance of the books module
pub fn create_module(catalog: &CatalogSettings) -> Arc<dyn Module> {
    let library = Arc::new(Library::new(catalog.name.clone(), Arc::new(MemoryStore)));
    Arc::new(BooksModule::new(library, catalog.clone()))
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn book_ref() -> Value {
    json!({ "$ref": "#/components/schemas/Book" })
}

fn book_list() -> Value {
    json!({ "type": "array", "items": book_ref() })
}

fn query_param(name: &str, schema: Value, description: &str) -> Value {
    json!({
        "name": name,
        "in": "query",
        "required": false,
        "schema": schema,
        "description": description
    })
}

fn id_param() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "string" },
        "description": "Book identifier"
    })
}

fn openapi_spec() -> Value {
    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "parameters": [
                        query_param("search", json!({ "type": "string" }),
                                    "Case-insensitive substring of title or author"),
                        query_param("genre", json!({ "type": "string" }), "Exact genre"),
                        query_param("borrowed", json!({ "type": "boolean" }), "Only borrowed books"),
                        query_param("scope",
                                    json!({ "type": "string",
                                            "enum": ["title_or_author", "title", "author", "genre", "any"] }),
                                    "Fields the search text is matched against")
                    ],
                    "responses": {
                        "200": json_response("Matching books", book_list()),
                        "400": error_response("Malformed query string")
                    }
                },
                "post": {
                    "summary": "Add a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": {
                            "schema": { "$ref": "#/components/schemas/NewBook" } } }
                    },
                    "responses": {
                        "201": json_response("Book added", book_ref()),
                        "400": error_response("Malformed request body"),
                        "422": error_response("Validation error"),
                        "503": error_response("Store unavailable")
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            },
            "/stats": {
                "get": {
                    "summary": "Library statistics",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("Counts", json!({ "$ref": "#/components/schemas/LibraryStats" }))
                    }
                }
            },
            "/dashboard": {
                "get": {
                    "summary": "Dashboard summary",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("Stats, top genres and authors, recent books",
                                             json!({ "$ref": "#/components/schemas/Dashboard" }))
                    }
                }
            },
            "/recent": {
                "get": {
                    "summary": "Recently added books",
                    "tags": ["Books"],
                    "parameters": [
                        query_param("limit", json!({ "type": "integer", "minimum": 0 }),
                                    "How many books to return")
                    ],
                    "responses": {
                        "200": json_response("Newest first", book_list()),
                        "400": error_response("Malformed query string")
                    }
                }
            },
            "/borrowed": {
                "get": {
                    "summary": "Borrowed books",
                    "tags": ["Books"],
                    "responses": { "200": json_response("Books out on loan", book_list()) }
                }
            },
            "/genres": {
                "get": {
                    "summary": "Distinct genres",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("Genres in first-seen order",
                                             json!({ "type": "array", "items": { "type": "string" } }))
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [id_param()],
                    "responses": {
                        "200": json_response("The book", book_ref()),
                        "404": error_response("Book not found")
                    }
                },
                "patch": {
                    "summary": "Edit a book",
                    "tags": ["Books"],
                    "parameters": [id_param()],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": {
                            "schema": { "$ref": "#/components/schemas/BookEdit" } } }
                    },
                    "responses": {
                        "200": json_response("Edited book", book_ref()),
                        "400": error_response("Malformed request body"),
                        "404": error_response("Book not found"),
                        "422": error_response("Validation error"),
                        "503": error_response("Store unavailable")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_param()],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "404": error_response("Book not found"),
                        "503": error_response("Store unavailable")
                    }
                }
            },
            "/{id}/borrow": {
                "post": {
                    "summary": "Lend a book",
                    "tags": ["Books"],
                    "parameters": [id_param()],
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": {
                            "type": "object",
                            "properties": { "borrower": { "type": "string" } },
                            "required": ["borrower"]
                        } } }
                    },
                    "responses": {
                        "200": json_response("Borrowed book", book_ref()),
                        "400": error_response("Malformed request body"),
                        "404": error_response("Book not found"),
                        "409": error_response("Already borrowed"),
                        "422": error_response("Borrower missing")
                    }
                }
            },
            "/{id}/return": {
                "post": {
                    "summary": "Return a book",
                    "tags": ["Books"],
                    "parameters": [id_param()],
                    "responses": {
                        "200": json_response("Returned book", book_ref()),
                        "404": error_response("Book not found"),
                        "409": error_response("Not borrowed")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "description": "Unique identifier for the book" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "genre": { "type": "string" },
                        "publication_year": { "type": ["integer", "null"],
                                              "minimum": 1000, "maximum": 9999 },
                        "isbn": { "type": ["string", "null"] },
                        "description": { "type": ["string", "null"] },
                        "is_borrowed": { "type": "boolean" },
                        "borrowed_date": { "type": ["string", "null"], "format": "date" },
                        "borrower": { "type": ["string", "null"] },
                        "date_added": { "type": "string", "format": "date-time" }
                    },
                    "required": ["id", "title", "author", "genre", "is_borrowed", "date_added"]
                },
                "NewBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "genre": { "type": "string" },
                        "publication_year": {
                            "description": "Four digit year, as a number or a numeral string",
                            "oneOf": [{ "type": "integer" }, { "type": "string", "pattern": "^\\d{4}$" }]
                        },
                        "isbn": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["title", "author", "genre"]
                },
                "BookEdit": {
                    "type": "object",
                    "description": "Absent fields are kept; null clears optional fields",
                    "properties": {
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "genre": { "type": "string" },
                        "publication_year": {
                            "oneOf": [
                                { "type": "integer" },
                                { "type": "string", "pattern": "^\\d{4}$" },
                                { "type": "null" }
                            ]
                        },
                        "isbn": { "type": ["string", "null"] },
                        "description": { "type": ["string", "null"] }
                    }
                },
                "LibraryStats": {
                    "type": "object",
                    "properties": {
                        "total": { "type": "integer" },
                        "available": { "type": "integer" },
                        "borrowed": { "type": "integer" },
                        "unique_genres": { "type": "integer" },
                        "unique_authors": { "type": "integer" }
                    },
                    "required": ["total", "available", "borrowed", "unique_genres", "unique_authors"]
                },
                "Tally": {
                    "type": "object",
                    "properties": {
                        "value": { "type": "string" },
                        "count": { "type": "integer" }
                    },
                    "required": ["value", "count"]
                },
                "Dashboard": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "stats": { "$ref": "#/components/schemas/LibraryStats" },
                        "top_genres": { "type": "array", "items": { "$ref": "#/components/schemas/Tally" } },
                        "top_authors": { "type": "array", "items": { "$ref": "#/components/schemas/Tally" } },
                        "recently_added": book_list()
                    },
                    "required": ["name", "stats", "top_genres", "top_authors", "recently_added"]
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_kernel::Settings;

    #[tokio::test]
    async fn init_seeds_sample_catalog() {
        let settings = Settings::default();
        let library = Arc::new(Library::new("Test", Arc::new(MemoryStore)));
        let module = BooksModule::new(Arc::clone(&library), settings.catalog.clone());

        module
            .init(&InitCtx {
                settings: &settings,
            })
            .await
            .unwrap();

        assert_eq!(library.get_stats().await.total, 5);
        assert!(Arc::ptr_eq(module.library(), &library));
    }

    #[tokio::test]
    async fn seed_file_is_appended_to_sample_data() {
        let path = std::env::temp_dir().join(format!("shelf-seed-{}.json", std::process::id()));
        std::fs::write(
            &path,
            json!([{
                "id": "seed-1",
                "title": "Foundation",
                "author": "Isaac Asimov",
                "genre": "Science Fiction",
                "publication_year": 1951,
                "date_added": "2024-06-01T12:00:00Z"
            }])
            .to_string(),
        )
        .unwrap();

        let catalog = CatalogSettings {
            seed_path: Some(path),
            ..CatalogSettings::default()
        };
        let library = open_library(&catalog).await.unwrap();

        assert_eq!(library.get_stats().await.total, 6);
        assert_eq!(library.recently_added(1).await[0].title, "Foundation");
    }

    #[test]
    fn missing_seed_file_is_an_error() {
        let catalog = CatalogSettings {
            sample_data: false,
            seed_path: Some("/nonexistent/shelf/seed.json".into()),
            ..CatalogSettings::default()
        };
        let err = seed_books(&catalog).unwrap_err();
        assert!(err.to_string().contains("failed to read seed file"));
    }

    #[tokio::test]
    async fn duplicate_seed_ids_fail_init() {
        let path = std::env::temp_dir().join(format!("shelf-dup-seed-{}.json", std::process::id()));
        std::fs::write(
            &path,
            json!([{
                "id": "1",
                "title": "Duplicate",
                "author": "Nobody",
                "genre": "Fiction",
                "date_added": "2024-06-01T12:00:00Z"
            }])
            .to_string(),
        )
        .unwrap();

        let mut settings = Settings::default();
        settings.catalog.seed_path = Some(path);
        let module = create_module(&settings.catalog);

        let result = module
            .init(&InitCtx {
                settings: &settings,
            })
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn openapi_describes_every_route() {
        let spec = openapi_spec();
        for path in [
            "/", "/health", "/stats", "/dashboard", "/recent", "/borrowed", "/genres", "/{id}",
            "/{id}/borrow", "/{id}/return",
        ] {
            assert!(spec["paths"][path].is_object(), "{path} undocumented");
        }
        assert!(spec["components"]["schemas"]["Book"].is_object());
    }
}
