//! The standard builtin functions.
//!
//! Every F-IA program can call these without importing anything.
//! The table in [`STD_MAP`] is consulted after user functions, so a
//! `fonction` declaration can shadow a builtin.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::{Read, Write};

use once_cell::sync::Lazy;

use super::rtio::IoHook;
use super::value::{normalize_index, Num, Value};
use super::{RtResult, RtTraversal, TermOp, TypeErr, ValueErr};

/// The signature shared by every builtin.
pub(super) type BuiltinFn = for<'ctx> fn(IoHook<'ctx>, Vec<Value>) -> RtTraversal<Value>;

macro_rules! str_map {
    ($($k:literal: $v:expr),*) => {{
        let mut m = HashMap::new();
        $(m.insert(String::from($k), $v as BuiltinFn);)*
        m
    }}
}

/// The builtin table, keyed by the name the program calls.
pub(super) static STD_MAP: Lazy<HashMap<String, BuiltinFn>> = Lazy::new(|| str_map! {
    "imprimer":       std_imprimer,
    "longueur":       std_longueur,
    "arrondir":       std_arrondir,
    "aleatoire":      std_aleatoire,
    "racine":         std_racine,
    "puissance":      std_puissance,

    "entier":         std_entier,
    "decimal":        std_decimal,
    "chaine":         std_chaine,
    "booleen":        std_booleen,

    "cles":           std_cles,
    "valeurs":        std_valeurs,
    "contient_cle":   std_contient_cle,
    "supprimer_cle":  std_supprimer_cle,
    "fusionner":      std_fusionner,
    "vider":          std_vider,

    "ajouter":        std_ajouter,
    "retirer":        std_retirer,
    "trier":          std_trier,
    "inverser":       std_inverser,
    "copier":         std_copier,
    "contient":       std_contient,
    "index_de":       std_index_de,
    "compter":        std_compter,

    "majuscule":      std_majuscule,
    "minuscule":      std_minuscule,
    "remplacer":      std_remplacer,
    "diviser":        std_diviser,
    "joindre":        std_joindre,

    "lire":           std_lire,
    "arreter":        std_arreter
});

fn arity_err<T>(name: &str, expected: usize, got: usize) -> RtTraversal<T> {
    Err(ValueErr::WrongArity {
        name: name.to_string(),
        expected,
        got
    })?
}

fn expect_num(fun: &'static str, v: &Value) -> RtResult<f64> {
    v.as_num()
        .map(Num::as_f64)
        .ok_or_else(|| TypeErr::BadArgument {
            fun,
            expected: "un nombre",
            got: v.ty()
        }.into())
}

fn expect_str(fun: &'static str, v: &Value) -> RtResult<String> {
    match v {
        Value::Str(s) => Ok(s.clone()),
        v => Err(TypeErr::BadArgument {
            fun,
            expected: "une chaîne",
            got: v.ty()
        })?,
    }
}

fn expect_list_val<'v>(fun: &'static str, v: &'v Value) -> RtResult<&'v Value> {
    match v {
        Value::List(_) => Ok(v),
        v => Err(TypeErr::BadArgument {
            fun,
            expected: "une liste",
            got: v.ty()
        })?,
    }
}

fn expect_dict_val<'v>(fun: &'static str, v: &'v Value) -> RtResult<&'v Value> {
    match v {
        Value::Dict(_) => Ok(v),
        v => Err(TypeErr::BadArgument {
            fun,
            expected: "un dictionnaire",
            got: v.ty()
        })?,
    }
}

fn std_imprimer(mut ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    let strs = args.iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");

    writeln!(ioref, "{strs}")?;
    Ok(Value::Null)
}

fn std_longueur(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [v] = &args[..] {
        let len = match v {
            Value::Str(s)  => s.chars().count(),
            Value::List(l) => l.borrow().len(),
            Value::Dict(d) => d.borrow().len(),
            v => Err(TypeErr::NoLength(v.ty()))?,
        };

        Ok(Value::Int(len as isize))
    } else {
        arity_err("longueur", 1, args.len())
    }
}

fn std_arrondir(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    match &args[..] {
        [v] => {
            let n = expect_num("arrondir", v)?;
            Ok(Value::Int(n.round() as isize))
        },
        [v, d] => {
            let n = expect_num("arrondir", v)?;
            let &Value::Int(d) = d else {
                return Err(TypeErr::BadArgument {
                    fun: "arrondir",
                    expected: "un entier",
                    got: d.ty()
                }.into());
            };

            let factor = 10f64.powi(d as i32);
            Ok(Value::Float((n * factor).round() / factor))
        },
        _ => arity_err("arrondir", 1, args.len()),
    }
}

fn std_aleatoire(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if args.is_empty() {
        Ok(Value::Float(rand::random::<f64>()))
    } else {
        arity_err("aleatoire", 0, args.len())
    }
}

fn std_racine(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [v] = &args[..] {
        let n = expect_num("racine", v)?;
        if n < 0.0 {
            return Err(ValueErr::NegativeSqrt.into());
        }

        Ok(Value::Float(n.sqrt()))
    } else {
        arity_err("racine", 1, args.len())
    }
}

fn std_puissance(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [base, exp] = &args[..] {
        let base = expect_num("puissance", base)?;
        let exp = expect_num("puissance", exp)?;

        Ok(Value::Float(base.powf(exp)))
    } else {
        arity_err("puissance", 2, args.len())
    }
}

fn std_entier(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [v] = &args[..] {
        let n = match v {
            Value::Null     => 0,
            Value::Bool(b)  => *b as isize,
            Value::Int(n)   => *n,
            Value::Float(f) => f.trunc() as isize,
            Value::Str(s) => {
                let t = s.trim();
                if t.is_empty() {
                    0
                } else if let Ok(n) = t.parse::<isize>() {
                    n
                } else if let Ok(f) = t.parse::<f64>() {
                    f.trunc() as isize
                } else {
                    Err(ValueErr::InvalidConversion {
                        fun: "entier",
                        val: v.to_string()
                    })?
                }
            },
            Value::List(_) | Value::Dict(_) => Err(ValueErr::ConversionUnsupported("entier"))?,
            v => Err(ValueErr::InvalidConversion {
                fun: "entier",
                val: v.to_string()
            })?,
        };

        Ok(Value::Int(n))
    } else {
        arity_err("entier", 1, args.len())
    }
}

fn std_decimal(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [v] = &args[..] {
        let f = match v {
            Value::Null     => 0.0,
            Value::Bool(b)  => *b as isize as f64,
            Value::Int(n)   => *n as f64,
            Value::Float(f) => *f,
            Value::Str(s) => {
                let t = s.trim();
                if t.is_empty() {
                    0.0
                } else if let Ok(f) = t.parse::<f64>() {
                    f
                } else {
                    Err(ValueErr::InvalidConversion {
                        fun: "decimal",
                        val: v.to_string()
                    })?
                }
            },
            Value::List(_) | Value::Dict(_) => Err(ValueErr::ConversionUnsupported("decimal"))?,
            v => Err(ValueErr::InvalidConversion {
                fun: "decimal",
                val: v.to_string()
            })?,
        };

        Ok(Value::Float(f))
    } else {
        arity_err("decimal", 1, args.len())
    }
}

fn std_chaine(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [v] = &args[..] {
        let s = match v {
            Value::Null => String::new(),
            Value::List(_) | Value::Dict(_) => v.compact_repr(),
            v => v.to_string(),
        };

        Ok(Value::Str(s))
    } else {
        arity_err("chaine", 1, args.len())
    }
}

fn std_booleen(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [v] = &args[..] {
        let b = match v {
            Value::Str(s) => match s.to_lowercase().as_str() {
                "true" | "vrai" | "oui" | "1" => true,
                "false" | "faux" | "non" | "0" | "" => false,
                _ => true,
            },
            v => v.truth(),
        };

        Ok(Value::Bool(b))
    } else {
        arity_err("booleen", 1, args.len())
    }
}

fn std_cles(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [v] = &args[..] {
        let Value::Dict(d) = expect_dict_val("cles", v)? else { unreachable!() };
        let keys = d.borrow().keys()
            .cloned()
            .map(Value::Str)
            .collect();

        Ok(Value::new_list(keys))
    } else {
        arity_err("cles", 1, args.len())
    }
}

fn std_valeurs(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [v] = &args[..] {
        let Value::Dict(d) = expect_dict_val("valeurs", v)? else { unreachable!() };
        let values = d.borrow().values()
            .cloned()
            .collect();

        Ok(Value::new_list(values))
    } else {
        arity_err("valeurs", 1, args.len())
    }
}

fn std_contient_cle(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [v, k] = &args[..] {
        let Value::Dict(d) = expect_dict_val("contient_cle", v)? else { unreachable!() };
        let has = d.borrow().contains_key(&k.to_string());

        Ok(Value::Bool(has))
    } else {
        arity_err("contient_cle", 2, args.len())
    }
}

fn std_supprimer_cle(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [v, k] = &args[..] {
        let Value::Dict(d) = expect_dict_val("supprimer_cle", v)? else { unreachable!() };
        d.borrow_mut().shift_remove(&k.to_string());

        Ok(v.clone())
    } else {
        arity_err("supprimer_cle", 2, args.len())
    }
}

fn std_fusionner(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [a, b] = &args[..] {
        let Value::Dict(da) = expect_dict_val("fusionner", a)? else { unreachable!() };
        let Value::Dict(db) = expect_dict_val("fusionner", b)? else { unreachable!() };

        let mut merged = da.borrow().clone();
        for (k, v) in db.borrow().iter() {
            merged.insert(k.clone(), v.clone());
        }

        Ok(Value::new_dict(merged))
    } else {
        arity_err("fusionner", 2, args.len())
    }
}

fn std_vider(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [v] = &args[..] {
        let Value::Dict(d) = expect_dict_val("vider", v)? else { unreachable!() };
        d.borrow_mut().clear();

        Ok(v.clone())
    } else {
        arity_err("vider", 1, args.len())
    }
}

fn std_ajouter(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [lv, v] = &args[..] {
        let Value::List(l) = expect_list_val("ajouter", lv)? else { unreachable!() };
        l.borrow_mut().push(v.clone());

        Ok(lv.clone())
    } else {
        arity_err("ajouter", 2, args.len())
    }
}

fn std_retirer(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [lv, iv] = &args[..] {
        let Value::List(l) = expect_list_val("retirer", lv)? else { unreachable!() };

        let mut list = l.borrow_mut();
        let len = list.len();
        let i = normalize_index(iv, len)?;
        list.remove(i);
        drop(list);

        Ok(lv.clone())
    } else {
        arity_err("retirer", 2, args.len())
    }
}

fn std_trier(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [lv] = &args[..] {
        let Value::List(l) = expect_list_val("trier", lv)? else { unreachable!() };
        let mut items = l.borrow_mut();

        if items.iter().all(|v| v.as_num().is_some()) {
            items.sort_by(|a, b| match (a.as_num(), b.as_num()) {
                (Some(x), Some(y)) => x.as_f64().partial_cmp(&y.as_f64())
                    .unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            });
        } else if items.iter().all(|v| matches!(v, Value::Str(_))) {
            items.sort_by(|a, b| match (a, b) {
                (Value::Str(x), Value::Str(y)) => x.cmp(y),
                _ => Ordering::Equal,
            });
        } else {
            return Err(TypeErr::MixedSort.into());
        }
        drop(items);

        Ok(lv.clone())
    } else {
        arity_err("trier", 1, args.len())
    }
}

fn std_inverser(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [lv] = &args[..] {
        let Value::List(l) = expect_list_val("inverser", lv)? else { unreachable!() };
        l.borrow_mut().reverse();

        Ok(lv.clone())
    } else {
        arity_err("inverser", 1, args.len())
    }
}

fn std_copier(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [lv] = &args[..] {
        let Value::List(l) = expect_list_val("copier", lv)? else { unreachable!() };
        let copy = l.borrow().clone();

        Ok(Value::new_list(copy))
    } else {
        arity_err("copier", 1, args.len())
    }
}

fn std_contient(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [lv, v] = &args[..] {
        let Value::List(l) = expect_list_val("contient", lv)? else { unreachable!() };
        let has = l.borrow().iter().any(|x| x == v);

        Ok(Value::Bool(has))
    } else {
        arity_err("contient", 2, args.len())
    }
}

fn std_index_de(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [lv, v] = &args[..] {
        let Value::List(l) = expect_list_val("index_de", lv)? else { unreachable!() };
        let i = l.borrow().iter()
            .position(|x| x == v)
            .map_or(-1, |i| i as isize);

        Ok(Value::Int(i))
    } else {
        arity_err("index_de", 2, args.len())
    }
}

fn std_compter(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [lv, v] = &args[..] {
        let Value::List(l) = expect_list_val("compter", lv)? else { unreachable!() };
        let n = l.borrow().iter()
            .filter(|x| *x == v)
            .count();

        Ok(Value::Int(n as isize))
    } else {
        arity_err("compter", 2, args.len())
    }
}

fn std_majuscule(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [v] = &args[..] {
        Ok(Value::Str(expect_str("majuscule", v)?.to_uppercase()))
    } else {
        arity_err("majuscule", 1, args.len())
    }
}

fn std_minuscule(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [v] = &args[..] {
        Ok(Value::Str(expect_str("minuscule", v)?.to_lowercase()))
    } else {
        arity_err("minuscule", 1, args.len())
    }
}

fn std_remplacer(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [t, from, to] = &args[..] {
        let t = expect_str("remplacer", t)?;
        let from = expect_str("remplacer", from)?;
        let to = expect_str("remplacer", to)?;

        Ok(Value::Str(t.replace(&from, &to)))
    } else {
        arity_err("remplacer", 3, args.len())
    }
}

fn std_diviser(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [t, sep] = &args[..] {
        let t = expect_str("diviser", t)?;
        let sep = expect_str("diviser", sep)?;
        if sep.is_empty() {
            return Err(TypeErr::BadArgument {
                fun: "diviser",
                expected: "un séparateur non vide",
                got: "chaîne"
            }.into());
        }

        let parts = t.split(&sep)
            .map(|p| Value::Str(p.to_string()))
            .collect();
        Ok(Value::new_list(parts))
    } else {
        arity_err("diviser", 2, args.len())
    }
}

fn std_joindre(_ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    if let [lv, sep] = &args[..] {
        let Value::List(l) = expect_list_val("joindre", lv)? else { unreachable!() };
        let sep = expect_str("joindre", sep)?;

        let joined = l.borrow().iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(&sep);
        Ok(Value::Str(joined))
    } else {
        arity_err("joindre", 2, args.len())
    }
}

fn std_lire(mut ioref: IoHook, args: Vec<Value>) -> RtTraversal<Value> {
    match &args[..] {
        [] => {},
        [prompt] => {
            write!(ioref, "{prompt}")?;
            ioref.flush()?;
        },
        _ => return arity_err("lire", 1, args.len()),
    }

    Ok(Value::Str(read_line(&mut ioref)?))
}

fn std_arreter(_ioref: IoHook, _args: Vec<Value>) -> RtTraversal<Value> {
    Err(TermOp::Stop)
}

/// Read one line from the input hook. The end of input reads as an
/// empty line.
fn read_line(ioref: &mut IoHook) -> std::io::Result<String> {
    let mut bytes = vec![];
    let mut byte = [0u8; 1];

    loop {
        match ioref.read(&mut byte)? {
            0 => break,
            _ if byte[0] == b'\n' => break,
            _ => bytes.push(byte[0]),
        }
    }

    let mut line = String::from_utf8_lossy(&bytes).into_owned();
    if line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::super::RuntimeErr;
    use super::*;

    fn call(f: BuiltinFn, args: Vec<Value>) -> Value {
        match f(IoHook::default(), args) {
            Ok(v) => v,
            Err(TermOp::Err(e)) => panic!("builtin failed: {}", e.short_msg()),
            Err(_) => panic!("builtin terminated the program"),
        }
    }

    #[test]
    fn imprimer_joins_with_spaces() {
        let mut buf = vec![];
        let hook = IoHook::new_w(&mut buf);

        std_imprimer(hook, vec![
            Value::Str(String::from("a")),
            Value::Int(1),
            Value::Bool(true)
        ]).unwrap();

        assert_eq!(String::from_utf8(buf).unwrap(), "a 1 vrai\n");
    }

    #[test]
    fn entier_conversions() {
        assert_eq!(call(std_entier, vec![Value::Null]), Value::Int(0));
        assert_eq!(call(std_entier, vec![Value::Bool(true)]), Value::Int(1));
        assert_eq!(call(std_entier, vec![Value::Float(-3.9)]), Value::Int(-3));
        assert_eq!(call(std_entier, vec![Value::Str(String::from("  42 "))]), Value::Int(42));
        assert_eq!(call(std_entier, vec![Value::Str(String::from("3.9"))]), Value::Int(3));
        assert_eq!(call(std_entier, vec![Value::Str(String::new())]), Value::Int(0));

        let err = std_entier(IoHook::default(), vec![Value::Str(String::from("abc"))])
            .expect_err("entier('abc') should fail");
        match err {
            TermOp::Err(e) => assert!(matches!(
                e.err,
                RuntimeErr::ValueErr(ValueErr::InvalidConversion { fun: "entier", .. })
            )),
            other => panic!("expected an error, got {other:?}"),
        }

        let err = std_entier(IoHook::default(), vec![Value::new_list(vec![])])
            .expect_err("entier([]) should fail");
        match err {
            TermOp::Err(e) => assert!(matches!(
                e.err,
                RuntimeErr::ValueErr(ValueErr::ConversionUnsupported("entier"))
            )),
            other => panic!("expected an error, got {other:?}"),
        }
    }

    #[test]
    fn booleen_strings() {
        for s in ["vrai", "OUI", "true", "1"] {
            assert_eq!(call(std_booleen, vec![Value::Str(String::from(s))]), Value::Bool(true));
        }
        for s in ["faux", "NON", "false", "0", ""] {
            assert_eq!(call(std_booleen, vec![Value::Str(String::from(s))]), Value::Bool(false));
        }
        // any other non-empty string is truthy
        assert_eq!(call(std_booleen, vec![Value::Str(String::from("peut-être"))]), Value::Bool(true));
    }

    #[test]
    fn chaine_compact_json() {
        let l = Value::new_list(vec![Value::Int(1), Value::Str(String::from("a"))]);
        assert_eq!(call(std_chaine, vec![l]), Value::Str(String::from("[1,\"a\"]")));
        assert_eq!(call(std_chaine, vec![Value::Null]), Value::Str(String::new()));
    }

    #[test]
    fn ajouter_returns_same_list() {
        let l = Value::new_list(vec![Value::Int(1)]);
        let out = call(std_ajouter, vec![l.clone(), Value::Int(2)]);

        assert_eq!(out, l);
        assert_eq!(l, Value::new_list(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn index_de_missing_is_minus_one() {
        let l = Value::new_list(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(call(std_index_de, vec![l.clone(), Value::Int(2)]), Value::Int(1));
        assert_eq!(call(std_index_de, vec![l, Value::Int(9)]), Value::Int(-1));
    }

    #[test]
    fn trier_sorts_in_place() {
        let l = Value::new_list(vec![Value::Int(3), Value::Float(1.5), Value::Int(2)]);
        call(std_trier, vec![l.clone()]);
        assert_eq!(l, Value::new_list(vec![Value::Float(1.5), Value::Int(2), Value::Int(3)]));

        let mixed = Value::new_list(vec![Value::Int(1), Value::Str(String::from("a"))]);
        let err = std_trier(IoHook::default(), vec![mixed])
            .expect_err("sorting mixed types should fail");
        assert!(matches!(err, TermOp::Err(_)));
    }

    #[test]
    fn joindre_stringifies() {
        let l = Value::new_list(vec![Value::Int(1), Value::Bool(false), Value::Str(String::from("x"))]);
        assert_eq!(
            call(std_joindre, vec![l, Value::Str(String::from("-"))]),
            Value::Str(String::from("1-faux-x"))
        );
    }
}
