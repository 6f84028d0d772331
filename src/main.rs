use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use thaliak::config::Settings;
use thaliak::text_document::PositionEncoding;
use thaliak::workspace::Workspace;
use thaliak::{codeactions, color, completion, gotodef, hover, references};

/// Language server for raid timeline documents, speaking LSP over stdio.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
struct Cli {
    /// Directory holding the enum files; found next to the raid documents when omitted
    #[arg(long)]
    enums_dir: Option<PathBuf>,
    /// Maximum number of problems reported per document
    #[arg(long)]
    max_problems: Option<usize>,
}

struct Backend {
    client: Client,
    cli: Cli,
    workspace: RwLock<Workspace>,
}

impl Backend {
    fn settings(&self, root: Option<&Path>) -> Settings {
        let mut settings = match root.map(Settings::new) {
            Some(Ok(settings)) => settings,
            Some(Err(err)) => {
                warn!(%err, "failed to read settings, using defaults");
                Settings::default()
            }
            None => Settings::default(),
        };
        if let Some(dir) = &self.cli.enums_dir {
            settings.enums_dir = Some(dir.clone());
        }
        if let Some(max) = self.cli.max_problems {
            settings.max_number_of_problems = max;
        }
        settings
    }

    async fn publish(&self, uris: Vec<Url>) {
        let results: Vec<_> = {
            let mut workspace = self.workspace.write().await;
            uris.into_iter()
                .filter_map(|uri| {
                    let diagnostics = workspace.lint(&uri)?;
                    let version = workspace.document(&uri).map(|it| it.version());
                    Some((uri, diagnostics, version))
                })
                .collect()
        };
        for (uri, diagnostics, version) in results {
            self.client
                .publish_diagnostics(uri, diagnostics, version)
                .await;
        }
    }

    /// Relints `uri`, or every open document when an enum file changed.
    async fn publish_after_edit(&self, uri: Url, enums_changed: bool) {
        let uris = match enums_changed {
            true => self.workspace.read().await.open_documents(),
            false => vec![uri],
        };
        self.publish(uris).await;
    }

    async fn publish_all(&self) {
        let uris = self.workspace.read().await.open_documents();
        self.publish(uris).await;
    }
}

#[allow(deprecated)]
fn root_of(params: &InitializeParams) -> Option<PathBuf> {
    params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .map(|folder| folder.uri.clone())
        .or_else(|| params.root_uri.clone())
        .and_then(|uri| uri.to_file_path().ok())
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = root_of(&params);
        let settings = self.settings(root.as_deref());
        let encoding = PositionEncoding::negotiate(
            params
                .capabilities
                .general
                .as_ref()
                .and_then(|general| general.position_encodings.as_deref()),
        );
        info!(root = ?root, ?settings, ?encoding, "initializing");
        *self.workspace.write().await =
            Workspace::new(settings, root).with_position_encoding(encoding);

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "thaliak".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                position_encoding: Some(encoding.kind()),
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(
                        ["[", "(", ":", " "].map(str::to_string).to_vec(),
                    ),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
                color_provider: Some(ColorProviderCapability::Simple(true)),
                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                        supported: Some(true),
                        change_notifications: Some(OneOf::Left(true)),
                    }),
                    file_operations: None,
                }),
                ..Default::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "thaliak initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        let enums_changed = self.workspace.write().await.open(
            document.uri.clone(),
            document.version,
            document.text,
        );
        self.publish_after_edit(document.uri, enums_changed).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let document = params.text_document;
        let enums_changed =
            self.workspace
                .write()
                .await
                .change(&document.uri, document.version, params.content_changes);
        self.publish_after_edit(document.uri, enums_changed).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.workspace.write().await.close(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let changed = self
            .workspace
            .write()
            .await
            .apply_client_settings(&params.settings);
        debug!(changed, "configuration changed");
        if changed {
            self.publish_all().await;
        }
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        {
            let mut workspace = self.workspace.write().await;
            let root = params
                .event
                .added
                .first()
                .and_then(|folder| folder.uri.to_file_path().ok())
                .or_else(|| workspace.root().cloned());
            workspace.reset(root);
        }
        self.publish_all().await;
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let position = params.text_document_position_params.position;
        let uri = params.text_document_position_params.text_document.uri;
        let mut workspace = self.workspace.write().await;
        let settings = workspace.settings().clone();
        Ok(workspace
            .snapshot(&uri)
            .and_then(|snapshot| hover::hover(snapshot, position, &settings)))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params.position;
        let uri = params.text_document_position_params.text_document.uri;
        let mut workspace = self.workspace.write().await;
        Ok(workspace
            .snapshot(&uri)
            .and_then(|snapshot| gotodef::goto_definition(snapshot, position))
            .map(GotoDefinitionResponse::Link))
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let position = params.text_document_position.position;
        let uri = params.text_document_position.text_document.uri;
        let include_declaration = params.context.include_declaration;
        let mut workspace = self.workspace.write().await;
        Ok(workspace.snapshot(&uri).and_then(|snapshot| {
            references::references(snapshot, position, include_declaration)
        }))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let position = params.text_document_position.position;
        let uri = params.text_document_position.text_document.uri;
        let mut workspace = self.workspace.write().await;
        Ok(workspace
            .snapshot(&uri)
            .and_then(|snapshot| completion::get_completions(snapshot, position)))
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let uri = params.text_document.uri;
        let mut workspace = self.workspace.write().await;
        let fixable = workspace.fixable(&uri).to_vec();
        Ok(workspace.snapshot(&uri).map(|snapshot| {
            codeactions::code_actions(snapshot, params.range, &params.context.diagnostics, &fixable)
        }))
    }

    async fn document_color(&self, params: DocumentColorParams) -> Result<Vec<ColorInformation>> {
        let workspace = self.workspace.read().await;
        Ok(workspace
            .document(&params.text_document.uri)
            .map(color::document_colors)
            .unwrap_or_default())
    }

    async fn color_presentation(
        &self,
        params: ColorPresentationParams,
    ) -> Result<Vec<ColorPresentation>> {
        Ok(color::color_presentations(params.color))
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("thaliak=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(|client| Backend {
        client,
        workspace: RwLock::new(Workspace::new(Settings::default(), None)),
        cli,
    });
    Server::new(stdin, stdout, socket).serve(service).await;
}
