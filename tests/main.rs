//! End-to-end runs of whole programs, module imports included.

use std::env;
use std::fs;
use std::path::PathBuf;

use fia_lang::interpreter::runtime::rtio::IoHook;
use fia_lang::interpreter::runtime::{RtContext, Value};
use fia_lang::{lexer, parser};

fn run_captured(input: &str) -> String {
    let mut out = vec![];
    {
        let mut ctx = RtContext::with_io(IoHook::new_w(&mut out));
        run_in(&mut ctx, input);
    }

    String::from_utf8(out).unwrap()
}

fn run_in(ctx: &mut RtContext, input: &str) -> Value {
    let tokens = lexer::tokenize(input).unwrap();
    let prog = parser::parse(tokens).unwrap();
    match ctx.run_program(&prog) {
        Ok(v) => v,
        Err(e) => panic!("{}", e.full_msg(input)),
    }
}

/// A fresh directory under the system temp dir, for module fixtures.
fn fixture_dir(name: &str) -> PathBuf {
    let dir = env::temp_dir().join("fia-e2e-tests").join(name);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Run a script as if it were `principal.fia` inside `dir`, with its
/// output captured.
fn run_script_in(dir: &PathBuf, input: &str) -> (Result<Value, String>, String) {
    let mut out = vec![];
    let result = {
        let hook = IoHook::new_w(&mut out);
        let mut ctx = RtContext::for_file_with_io(dir.join("principal.fia"), hook);

        let tokens = lexer::tokenize(input).unwrap();
        let prog = parser::parse(tokens).unwrap();
        ctx.run_program(&prog).map_err(|e| e.full_msg(input))
    };

    (result, String::from_utf8(out).unwrap())
}

#[test]
fn fizzbuzz_like_program() {
    let out = run_captured("
        pour (soit i = 1; i <= 15; i += 1) {
            si (i % 15 == 0) { imprimer(\"chatchien\"); }
            sinon si (i % 3 == 0) { imprimer(\"chat\"); }
            sinon si (i % 5 == 0) { imprimer(\"chien\"); }
            sinon { imprimer(i); }
        }
    ");

    let expected = "1\n2\nchat\n4\nchien\nchat\n7\n8\nchat\nchien\n11\nchat\n13\n14\nchatchien\n";
    assert_eq!(out, expected);
}

#[test]
fn runs_are_deterministic() {
    let prog = "
        soit d = {\"b\": 2, \"a\": 1};
        pour k dans d { imprimer(k, d[k]); }
        imprimer(racine(2) * puissance(2, 10));
    ";

    assert_eq!(run_captured(prog), run_captured(prog));
}

#[test]
fn conversion_builtins() {
    let out = run_captured("
        imprimer(entier(\"42\") + 1);
        imprimer(decimal(3));
        imprimer(chaine(nul) + \"fin\");
        imprimer(booleen(\"oui\"), booleen(\"non\"), booleen(0));
    ");

    assert_eq!(out, "43\n3.0\nfin\nvrai faux faux\n");
}

#[test]
fn list_builtins() {
    let out = run_captured("
        soit l = [3, 1, 2];
        trier(l);
        ajouter(l, 4);
        imprimer(joindre(l, \"-\"));
        imprimer(longueur(l), contient(l, 4), index_de(l, 9));
    ");

    assert_eq!(out, "1-2-3-4\n4 vrai -1\n");
}

#[test]
fn lire_reads_hooked_input() {
    let mut input = "Ada\n".as_bytes();
    let mut out = vec![];
    {
        let hook = IoHook::new_rw(&mut input, &mut out);
        let mut ctx = RtContext::with_io(hook);
        run_in(&mut ctx, "soit nom = lire(\"Nom: \"); imprimer(\"Bonjour \" + nom);");
    }

    assert_eq!(String::from_utf8(out).unwrap(), "Nom: Bonjour Ada\n");
}

#[test]
fn module_side_effects_fire_once() {
    let dir = fixture_dir("side-effects");
    fs::write(dir.join("effets.fia"), "imprimer(\"chargé\"); soit n = 1;").unwrap();

    let (result, out) = run_script_in(&dir, "
        importer \"./effets\";
        importer \"./effets\" comme e2;
        imprimer(effets.n + e2.n);
    ");

    result.unwrap();
    assert_eq!(out, "chargé\n2\n");
}

#[test]
fn transitive_imports_execute_once() {
    let dir = fixture_dir("transitive");
    fs::write(dir.join("base.fia"), "imprimer(\"base chargé\"); soit n = 1;").unwrap();
    fs::write(dir.join("haut.fia"), "importer \"./base\"; soit m = base.n + 1;").unwrap();

    // `base` is imported directly and again through `haut`
    let (result, out) = run_script_in(&dir, "
        importer \"./base\";
        importer \"./haut\";
        imprimer(base.n + haut.m);
    ");

    result.unwrap();
    assert_eq!(out, "base chargé\n3\n");
}

#[test]
fn depuis_imports_run_with_importer_globals() {
    let dir = fixture_dir("depuis");
    fs::write(dir.join("geo.fia"), "
        soit pi = 3.14;
        fonction aire(r) { retourner pi * r * r; }
    ").unwrap();

    let (result, out) = run_script_in(&dir, "
        depuis \"./geo\" importer aire, pi;
        imprimer(aire(1));
        imprimer(pi);
    ");

    result.unwrap();
    assert_eq!(out, "3.14\n3.14\n");
}

#[test]
fn module_calls_run_with_module_globals() {
    let dir = fixture_dir("qualified");
    fs::write(dir.join("geo.fia"), "
        soit pi = 3.14;
        fonction aire(r) { retourner pi * r * r; }
    ").unwrap();

    // the caller's own `pi` does not leak into the module's function
    let (result, out) = run_script_in(&dir, "
        importer \"./geo\";
        soit pi = 0;
        imprimer(geo.aire(2));
        imprimer(geo.pi);
    ");

    result.unwrap();
    assert_eq!(out, "12.56\n3.14\n");
}

#[test]
fn import_alias_shadows_nothing() {
    let dir = fixture_dir("alias");
    fs::write(dir.join("outils.fia"), "fonction double(n) { retourner n * 2; }").unwrap();

    let (result, out) = run_script_in(&dir, "
        importer \"./outils\" comme o;
        imprimer(o.double(21));
    ");

    result.unwrap();
    assert_eq!(out, "42\n");
}

#[test]
fn circular_imports_are_reported() {
    let dir = fixture_dir("cycle");
    fs::write(dir.join("a.fia"), "importer \"./b\";").unwrap();
    fs::write(dir.join("b.fia"), "importer \"./a\";").unwrap();

    let (result, _) = run_script_in(&dir, "importer \"./a\";");

    let msg = result.unwrap_err();
    assert!(msg.contains("import circulaire"), "got: {msg}");
}

#[test]
fn missing_module_is_reported() {
    let dir = fixture_dir("missing");

    let (result, _) = run_script_in(&dir, "importer \"fantome\";");

    let msg = result.unwrap_err();
    assert!(msg.contains("introuvable"), "got: {msg}");
    assert!(msg.contains("erreur de module"), "got: {msg}");
}

#[test]
fn module_errors_carry_the_module_path() {
    let dir = fixture_dir("broken");
    fs::write(dir.join("casse.fia"), "soit x = 1 / 0;").unwrap();

    let (result, _) = run_script_in(&dir, "importer \"./casse\";");

    let msg = result.unwrap_err();
    assert!(msg.contains("casse"), "got: {msg}");
    assert!(msg.contains("division par zéro"), "got: {msg}");
}

#[test]
fn missing_export_is_reported() {
    let dir = fixture_dir("missing-export");
    fs::write(dir.join("outils.fia"), "soit a = 1;").unwrap();

    let (result, _) = run_script_in(&dir, "depuis \"./outils\" importer fantome;");

    let msg = result.unwrap_err();
    assert!(msg.contains("fantome"), "got: {msg}");
    assert!(msg.contains("erreur de nom"), "got: {msg}");
}
