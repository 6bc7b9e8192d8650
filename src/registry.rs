// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Built-in compressor families, addressable by a short name.

use crate::settings::FileType;

/// In-process compressors shipped with minilab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKind {
  NoCompress,
  JsonMinify,
}

/// How to run an external minifier reading stdin and writing stdout.
#[derive(Debug, Clone, Copy)]
pub struct CommandTemplate {
  pub program: &'static str,
  pub args: &'static [&'static str],
  /// Extra arguments depending on the file type being compressed.
  pub type_args: &'static [(FileType, &'static [&'static str])],
  pub binary: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum BuiltinKind {
  Native(NativeKind),
  Command(CommandTemplate),
}

#[derive(Debug, Clone, Copy)]
pub struct BuiltinSpec {
  pub name: &'static str,
  /// Name of the export holding the compressor inside the built-in module.
  pub export: &'static str,
  pub kind: BuiltinKind,
}

const fn command(program: &'static str, args: &'static [&'static str]) -> BuiltinKind {
  BuiltinKind::Command(CommandTemplate {
    program,
    args,
    type_args: &[],
    binary: false,
  })
}

const fn typed_command(
  program: &'static str,
  args: &'static [&'static str],
  type_args: &'static [(FileType, &'static [&'static str])],
) -> BuiltinKind {
  BuiltinKind::Command(CommandTemplate {
    program,
    args,
    type_args,
    binary: false,
  })
}

const fn binary_command(program: &'static str, args: &'static [&'static str]) -> BuiltinKind {
  BuiltinKind::Command(CommandTemplate {
    program,
    args,
    type_args: &[],
    binary: true,
  })
}

pub static BUILTINS: &[BuiltinSpec] = &[
  BuiltinSpec {
    name: "babel-minify",
    export: "babelMinify",
    kind: command("minify", &[]),
  },
  BuiltinSpec {
    name: "clean-css",
    export: "cleanCss",
    kind: command("cleancss", &[]),
  },
  BuiltinSpec {
    name: "crass",
    export: "crass",
    kind: command("crass", &["--optimize", "--min"]),
  },
  BuiltinSpec {
    name: "cssnano",
    export: "cssnano",
    kind: command("cssnano", &[]),
  },
  BuiltinSpec {
    name: "csso",
    export: "csso",
    kind: command("csso", &[]),
  },
  BuiltinSpec {
    name: "esbuild",
    export: "esbuild",
    kind: typed_command(
      "esbuild",
      &["--minify", "--log-level=warning"],
      &[
        (FileType::Js, &["--loader=js"]),
        (FileType::Css, &["--loader=css"]),
      ],
    ),
  },
  BuiltinSpec {
    name: "google-closure-compiler",
    export: "gcc",
    kind: command("google-closure-compiler", &["--compilation_level=SIMPLE"]),
  },
  BuiltinSpec {
    name: "html-minifier",
    export: "htmlMinifier",
    kind: command(
      "html-minifier-terser",
      &[
        "--collapse-whitespace",
        "--remove-comments",
        "--minify-css",
        "true",
        "--minify-js",
        "true",
      ],
    ),
  },
  BuiltinSpec {
    name: "imagemin",
    export: "imagemin",
    kind: binary_command("imagemin", &[]),
  },
  BuiltinSpec {
    name: "jsonminify",
    export: "jsonMinify",
    kind: BuiltinKind::Native(NativeKind::JsonMinify),
  },
  BuiltinSpec {
    name: "lightningcss",
    export: "lightningCss",
    kind: command("lightningcss", &["--minify"]),
  },
  BuiltinSpec {
    name: "minify-html",
    export: "minifyHtml",
    kind: command("minhtml", &["--minify-css", "--minify-js"]),
  },
  BuiltinSpec {
    name: "no-compress",
    export: "noCompress",
    kind: BuiltinKind::Native(NativeKind::NoCompress),
  },
  BuiltinSpec {
    name: "svgo",
    export: "svgo",
    kind: command("svgo", &["--input", "-", "--output", "-"]),
  },
  BuiltinSpec {
    name: "swc",
    export: "swc",
    kind: command(
      "swc",
      &[
        "--config-json",
        r#"{"minify":true,"jsc":{"minify":{"compress":true,"mangle":true}}}"#,
      ],
    ),
  },
  BuiltinSpec {
    name: "terser",
    export: "terser",
    kind: command("terser", &["--compress", "--mangle"]),
  },
  BuiltinSpec {
    name: "uglify-es",
    export: "uglifyEs",
    kind: command("uglifyjs", &["--compress", "--mangle"]),
  },
  BuiltinSpec {
    name: "uglify-js",
    export: "uglifyJs",
    kind: command("uglifyjs", &["--compress", "--mangle"]),
  },
  BuiltinSpec {
    name: "yui",
    export: "yui",
    kind: typed_command(
      "yuicompressor",
      &[],
      &[
        (FileType::Js, &["--type", "js"]),
        (FileType::Css, &["--type", "css"]),
      ],
    ),
  },
];

/// All built-in compressors, in registry order.
pub fn builtins() -> &'static [BuiltinSpec] {
  BUILTINS
}

pub fn builtin(name: &str) -> Option<&'static BuiltinSpec> {
  BUILTINS.iter().find(|spec| spec.name == name)
}

pub fn is_builtin(name: &str) -> bool {
  builtin(name).is_some()
}

/// The export name a built-in module uses for its compressor.
pub fn known_export_name(name: &str) -> Option<&'static str> {
  builtin(name).map(|spec| spec.export)
}
