//! Embedded boilerplate used when no external tool is available.
//!
//! Output is deliberately minimal: enough for the structure checks to pass
//! and for the platform's own tooling to take over. Every generator reports
//! the manual steps needed to finish the job.

use anyhow::Context;
use camino::Utf8Path;

use stackforge_config::{
    AndroidOptions, ComponentOptions, ComponentSpec, GoBackendOptions, IosOptions, NextjsOptions,
};
use stackforge_utils::atomic_write::write_file_atomic;
use stackforge_utils::error::GenerationError;
use stackforge_utils::types::ComponentType;

use crate::generator::{FallbackGenerator, FallbackOutcome, GenerationContext};

/// One file to write, relative to the component directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub path: String,
    pub content: String,
}

impl TemplateFile {
    fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Writes the embedded template set for one component type.
#[derive(Debug, Clone, Copy)]
pub struct TemplateFallback {
    component_type: ComponentType,
}

impl TemplateFallback {
    #[must_use]
    pub const fn new(component_type: ComponentType) -> Self {
        Self { component_type }
    }
}

impl FallbackGenerator for TemplateFallback {
    fn component_type(&self) -> ComponentType {
        self.component_type
    }

    fn validate_config(&self, spec: &ComponentSpec) -> Result<(), GenerationError> {
        if spec.component_type != self.component_type {
            return Err(GenerationError::validation(format!(
                "{} templates cannot generate a {} component",
                self.component_type, spec.component_type
            ))
            .with_component(&spec.name));
        }
        spec.validate()
            .map_err(|e| GenerationError::from_config(&spec.name, &e))
    }

    fn generate(
        &self,
        spec: &ComponentSpec,
        ctx: &GenerationContext,
    ) -> Result<FallbackOutcome, GenerationError> {
        let dir = ctx.component_dir(spec);
        let files = render(spec);
        write_all(&dir, &files).map_err(|e| {
            GenerationError::fallback_unavailable(format!(
                "embedded {} template could not be written",
                self.component_type
            ))
            .with_component(&spec.name)
            .with_cause(format!("{e:#}"))
        })?;
        tracing::debug!(component = %spec.name, files = files.len(), "Wrote embedded template");

        Ok(FallbackOutcome {
            output_path: dir,
            manual_steps: manual_steps(spec),
            warnings: Vec::new(),
        })
    }

    fn expected_files(&self, spec: &ComponentSpec) -> Vec<String> {
        render(spec).into_iter().map(|f| f.path).collect()
    }
}

fn write_all(dir: &Utf8Path, files: &[TemplateFile]) -> anyhow::Result<()> {
    for file in files {
        let path = dir.join(&file.path);
        write_file_atomic(&path, &file.content)
            .with_context(|| format!("Failed to write {path}"))?;
    }
    Ok(())
}

/// Files for `spec`, in write order.
#[must_use]
pub fn render(spec: &ComponentSpec) -> Vec<TemplateFile> {
    match &spec.options {
        ComponentOptions::Nextjs(opts) => nextjs_files(&spec.name, opts),
        ComponentOptions::GoBackend(opts) => go_files(&spec.name, opts),
        ComponentOptions::Android(opts) => android_files(&spec.name, opts),
        ComponentOptions::Ios(opts) => ios_files(&spec.name, opts),
    }
}

/// What the user still has to do after the template was written.
#[must_use]
pub fn manual_steps(spec: &ComponentSpec) -> Vec<String> {
    match &spec.options {
        ComponentOptions::Nextjs(opts) => vec![
            format!(
                "Install dependencies: {} install",
                opts.package_manager.as_str()
            ),
            "Copy .env.example to .env.local and fill in values".to_string(),
        ],
        ComponentOptions::GoBackend(_) => vec!["Fetch dependencies: go mod tidy".to_string()],
        ComponentOptions::Android(_) => vec![
            "Generate the Gradle wrapper: gradle wrapper".to_string(),
            "Open the project in Android Studio to install the SDK".to_string(),
        ],
        ComponentOptions::Ios(_) => vec![
            "Open Package.swift in Xcode to create an app target".to_string(),
            "Set your development team for code signing".to_string(),
        ],
    }
}

fn nextjs_files(name: &str, opts: &NextjsOptions) -> Vec<TemplateFile> {
    let ext = if opts.typescript { "tsx" } else { "jsx" };
    let mut dev_deps = Vec::new();
    if opts.typescript {
        dev_deps.push(r#"    "typescript": "^5.4.0""#);
        dev_deps.push(r#"    "@types/react": "^18.3.0""#);
        dev_deps.push(r#"    "@types/node": "^20.12.0""#);
    }
    if opts.tailwind {
        dev_deps.push(r#"    "tailwindcss": "^3.4.0""#);
        dev_deps.push(r#"    "postcss": "^8.4.0""#);
        dev_deps.push(r#"    "autoprefixer": "^10.4.0""#);
    }

    let package_json = format!(
        r#"{{
  "name": "{name}",
  "version": "0.1.0",
  "private": true,
  "scripts": {{
    "dev": "next dev",
    "build": "next build",
    "start": "next start",
    "lint": "next lint"
  }},
  "dependencies": {{
    "next": "^14.2.0",
    "react": "^18.3.0",
    "react-dom": "^18.3.0"
  }},
  "devDependencies": {{
{dev_deps}
  }}
}}
"#,
        dev_deps = dev_deps.join(",\n")
    );

    let page = format!(
        r#"export default function Home() {{
  return (
    <main>
      <h1>{name}</h1>
      <p>Generated by stackforge.</p>
    </main>
  );
}}
"#
    );

    let mut files = vec![
        TemplateFile::new("package.json", package_json),
        TemplateFile::new("next.config.mjs", "/** @type {import('next').NextConfig} */\nconst nextConfig = {};\n\nexport default nextConfig;\n"),
        TemplateFile::new(".env.example", "NEXT_PUBLIC_API_URL=http://localhost:8080\n"),
        TemplateFile::new(".gitignore", "node_modules/\n.next/\n.env*.local\n"),
    ];

    if opts.app_router {
        let props = if opts.typescript {
            "{ children }: { children: React.ReactNode }"
        } else {
            "{ children }"
        };
        let layout = format!(
            r#"export const metadata = {{ title: "{name}" }};

export default function RootLayout({props}) {{
  return (
    <html lang="en">
      <body>{{children}}</body>
    </html>
  );
}}
"#
        );
        files.push(TemplateFile::new(format!("app/layout.{ext}"), layout));
        files.push(TemplateFile::new(format!("app/page.{ext}"), page));
    } else {
        files.push(TemplateFile::new(format!("pages/index.{ext}"), page));
    }

    if opts.typescript {
        files.push(TemplateFile::new(
            "tsconfig.json",
            r#"{
  "compilerOptions": {
    "target": "ES2017",
    "lib": ["dom", "dom.iterable", "esnext"],
    "strict": true,
    "jsx": "preserve",
    "module": "esnext",
    "moduleResolution": "bundler",
    "noEmit": true,
    "plugins": [{ "name": "next" }]
  },
  "include": ["next-env.d.ts", "**/*.ts", "**/*.tsx"],
  "exclude": ["node_modules"]
}
"#,
        ));
    }

    if opts.tailwind {
        let content_glob = if opts.app_router { "./app/**/*" } else { "./pages/**/*" };
        files.push(TemplateFile::new(
            "tailwind.config.js",
            format!(
                "module.exports = {{\n  content: [\"{content_glob}.{{js,jsx,ts,tsx}}\"],\n  theme: {{ extend: {{}} }},\n  plugins: [],\n}};\n"
            ),
        ));
        files.push(TemplateFile::new(
            "postcss.config.js",
            "module.exports = {\n  plugins: { tailwindcss: {}, autoprefixer: {} },\n};\n",
        ));
    }

    files
}

fn go_files(name: &str, opts: &GoBackendOptions) -> Vec<TemplateFile> {
    vec![
        TemplateFile::new(
            "go.mod",
            format!("module {}\n\ngo {}\n", opts.module_path, opts.go_version),
        ),
        TemplateFile::new(
            "main.go",
            format!(
                r#"package main

import (
	"log"
	"net/http"
	"os"
)

func main() {{
	port := os.Getenv("PORT")
	if port == "" {{
		port = "8080"
	}}

	mux := http.NewServeMux()
	mux.HandleFunc("/healthz", func(w http.ResponseWriter, r *http.Request) {{
		w.WriteHeader(http.StatusOK)
		_, _ = w.Write([]byte("ok"))
	}})

	log.Printf("{name} listening on :%s", port)
	log.Fatal(http.ListenAndServe(":"+port, mux))
}}
"#
            ),
        ),
        TemplateFile::new(".env.example", "PORT=8080\n"),
        TemplateFile::new(
            "README.md",
            format!("# {name}\n\n```sh\ngo run .\ncurl localhost:8080/healthz\n```\n"),
        ),
    ]
}

fn android_files(name: &str, opts: &AndroidOptions) -> Vec<TemplateFile> {
    let package_dir = opts.package_name.replace('.', "/");
    let (plugin, source) = if opts.kotlin {
        (
            "    id(\"org.jetbrains.kotlin.android\") version \"1.9.24\" apply false\n",
            TemplateFile::new(
                format!("app/src/main/kotlin/{package_dir}/MainActivity.kt"),
                format!(
                    "package {}\n\nimport android.app.Activity\nimport android.os.Bundle\n\nclass MainActivity : Activity() {{\n    override fun onCreate(savedInstanceState: Bundle?) {{\n        super.onCreate(savedInstanceState)\n    }}\n}}\n",
                    opts.package_name
                ),
            ),
        )
    } else {
        (
            "",
            TemplateFile::new(
                format!("app/src/main/java/{package_dir}/MainActivity.java"),
                format!(
                    "package {};\n\nimport android.app.Activity;\nimport android.os.Bundle;\n\npublic class MainActivity extends Activity {{\n    @Override\n    protected void onCreate(Bundle savedInstanceState) {{\n        super.onCreate(savedInstanceState);\n    }}\n}}\n",
                    opts.package_name
                ),
            ),
        )
    };
    let kotlin_plugin = if opts.kotlin {
        "    id(\"org.jetbrains.kotlin.android\")\n"
    } else {
        ""
    };

    vec![
        TemplateFile::new(
            "settings.gradle.kts",
            format!(
                "pluginManagement {{\n    repositories {{\n        google()\n        mavenCentral()\n        gradlePluginPortal()\n    }}\n}}\n\nrootProject.name = \"{name}\"\ninclude(\":app\")\n"
            ),
        ),
        TemplateFile::new(
            "build.gradle.kts",
            format!("plugins {{\n    id(\"com.android.application\") version \"8.4.0\" apply false\n{plugin}}}\n"),
        ),
        TemplateFile::new(
            "app/build.gradle.kts",
            format!(
                "plugins {{\n    id(\"com.android.application\")\n{kotlin_plugin}}}\n\nandroid {{\n    namespace = \"{pkg}\"\n    compileSdk = 34\n\n    defaultConfig {{\n        applicationId = \"{pkg}\"\n        minSdk = {min_sdk}\n        targetSdk = 34\n        versionCode = 1\n        versionName = \"0.1.0\"\n    }}\n}}\n",
                pkg = opts.package_name,
                min_sdk = opts.min_sdk,
            ),
        ),
        TemplateFile::new(
            "app/src/main/AndroidManifest.xml",
            format!(
                "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<manifest xmlns:android=\"http://schemas.android.com/apk/res/android\">\n    <application android:label=\"{name}\">\n        <activity android:name=\".MainActivity\" android:exported=\"true\">\n            <intent-filter>\n                <action android:name=\"android.intent.action.MAIN\" />\n                <category android:name=\"android.intent.category.LAUNCHER\" />\n            </intent-filter>\n        </activity>\n    </application>\n</manifest>\n"
            ),
        ),
        source,
    ]
}

fn ios_files(name: &str, opts: &IosOptions) -> Vec<TemplateFile> {
    let major = opts
        .deployment_target
        .split('.')
        .next()
        .unwrap_or("16");
    vec![
        TemplateFile::new(
            "Package.swift",
            format!(
                r#"// swift-tools-version:5.9
import PackageDescription

let package = Package(
    name: "{name}",
    platforms: [.iOS(.v{major})],
    targets: [
        .executableTarget(name: "{name}", path: "Sources/{name}")
    ]
)
"#
            ),
        ),
        TemplateFile::new(
            format!("Sources/{name}/main.swift"),
            format!("// Bundle identifier: {}\nprint(\"Hello from {name}\")\n", opts.bundle_id),
        ),
        TemplateFile::new(
            "README.md",
            format!(
                "# {name}\n\nBundle id `{}`, deployment target iOS {}.\n",
                opts.bundle_id, opts.deployment_target
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use stackforge_runner::CancellationToken;
    use tempfile::TempDir;

    fn ctx(temp: &TempDir) -> GenerationContext {
        GenerationContext::new(
            Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap(),
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_every_type_reports_manual_steps() {
        let temp = TempDir::new().unwrap();
        for ty in ComponentType::ALL {
            let spec = ComponentSpec::new(ty, format!("c-{}", ty.as_str()));
            let outcome = TemplateFallback::new(ty).generate(&spec, &ctx(&temp)).unwrap();
            assert!(!outcome.manual_steps.is_empty(), "{ty}");
            for file in TemplateFallback::new(ty).expected_files(&spec) {
                assert!(outcome.output_path.join(&file).is_file(), "{ty}: {file}");
            }
        }
    }

    #[test]
    fn test_go_module_path_in_go_mod() {
        let temp = TempDir::new().unwrap();
        let spec = ComponentSpec::new(ComponentType::GoBackend, "Api");
        let outcome = TemplateFallback::new(ComponentType::GoBackend)
            .generate(&spec, &ctx(&temp))
            .unwrap();
        let go_mod = std::fs::read_to_string(outcome.output_path.join("go.mod")).unwrap();
        assert!(go_mod.starts_with("module example.com/api\n"));
        assert!(go_mod.contains("go 1.22"));
    }

    #[test]
    fn test_nextjs_pages_router_without_typescript() {
        let mut spec = ComponentSpec::new(ComponentType::Nextjs, "web");
        if let ComponentOptions::Nextjs(opts) = &mut spec.options {
            opts.typescript = false;
            opts.app_router = false;
            opts.tailwind = false;
        }
        let paths: Vec<String> = render(&spec).into_iter().map(|f| f.path).collect();
        assert!(paths.contains(&"pages/index.jsx".to_string()));
        assert!(!paths.contains(&"tsconfig.json".to_string()));
        assert!(!paths.contains(&"tailwind.config.js".to_string()));

        let package_json = render(&spec)
            .into_iter()
            .find(|f| f.path == "package.json")
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&package_json.content).unwrap();
        assert_eq!(parsed["name"], "web");
    }

    #[test]
    fn test_nextjs_package_json_is_valid_json() {
        let spec = ComponentSpec::new(ComponentType::Nextjs, "web");
        let package_json = render(&spec)
            .into_iter()
            .find(|f| f.path == "package.json")
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&package_json.content).unwrap();
        assert!(parsed["devDependencies"]["tailwindcss"].is_string());
    }

    #[test]
    fn test_android_source_follows_package() {
        let spec = ComponentSpec::new(ComponentType::Android, "mobile");
        let paths: Vec<String> = render(&spec).into_iter().map(|f| f.path).collect();
        assert!(paths.contains(&"app/src/main/kotlin/com/example/mobile/MainActivity.kt".to_string()));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let spec = ComponentSpec::new(ComponentType::Ios, "app");
        assert!(
            TemplateFallback::new(ComponentType::Android)
                .validate_config(&spec)
                .is_err()
        );
    }
}
