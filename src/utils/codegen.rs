use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::config::find_pair;
use crate::models::signal::TradeSignal;

// ══════════════════════════════════════════════════════════════
// Public API: types
// ══════════════════════════════════════════════════════════════

/// A single generated code file.
#[derive(Debug, Clone, Serialize)]
pub struct CodeFile {
    pub filename: String,
    pub code: String,
    /// Whether this is the main file (EA script).
    pub is_main: bool,
}

/// Result of code generation.
#[derive(Debug, Clone, Serialize)]
pub struct CodeGenerationResult {
    pub files: Vec<CodeFile>,
}

impl CodeGenerationResult {
    pub fn main_file(&self) -> Option<&CodeFile> {
        self.files.iter().find(|f| f.is_main)
    }
}

pub const EA_NAME: &str = "SignalDesk_Signal";

const DEFAULT_DIGITS: usize = 5;

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Generate an MQL5 Expert Advisor embedding the active signal.
///
/// With no signal every level is 0 and the signal type is `NONE`, so the EA
/// compiles but never trades.
pub fn generate_mql5(signal: Option<&TradeSignal>, pair: &str) -> CodeGenerationResult {
    let digits = find_pair(pair).map(|p| p.digits).unwrap_or(DEFAULT_DIGITS);
    let mut out = String::with_capacity(2048);

    mql5_header(&mut out, pair, signal);
    mql5_signal_data(&mut out, signal, digits);
    mql5_on_init(&mut out);
    mql5_on_tick(&mut out);

    CodeGenerationResult {
        files: vec![CodeFile {
            filename: format!("{}.mq5", EA_NAME),
            code: out,
            is_main: true,
        }],
    }
}

// ══════════════════════════════════════════════════════════════
// MQL5 Generation
// ══════════════════════════════════════════════════════════════

fn mql5_header(out: &mut String, pair: &str, signal: Option<&TradeSignal>) {
    writeln!(out, "//+------------------------------------------------------------------+").ok();
    writeln!(out, "//|                         {}.mq5", EA_NAME).ok();
    writeln!(out, "//|                    Generated by SignalDesk").ok();
    writeln!(out, "//|                    Pair: {}", pair).ok();
    if let Some(s) = signal {
        writeln!(out, "//|                    Signal time: {}", s.timestamp).ok();
    }
    writeln!(out, "//+------------------------------------------------------------------+").ok();
    writeln!(out, "#property copyright \"SignalDesk AI\"").ok();
    writeln!(out, "#property version   \"1.00\"").ok();
    writeln!(out, "#property strict").ok();
    writeln!(out, "#include <Trade/Trade.mqh>").ok();
    writeln!(out).ok();
}

fn mql5_signal_data(out: &mut String, signal: Option<&TradeSignal>, digits: usize) {
    let (entry, tp, sl, kind) = match signal {
        Some(s) => (s.entry, s.take_profit, s.stop_loss, s.kind.as_str()),
        None => (0.0, 0.0, 0.0, "NONE"),
    };

    writeln!(out, "// ═══════════════ SIGNAL DATA ═══════════════").ok();
    writeln!(out, "double EntryLevel = {};", format_level(entry, digits)).ok();
    writeln!(out, "double TPLevel    = {};", format_level(tp, digits)).ok();
    writeln!(out, "double SLLevel    = {};", format_level(sl, digits)).ok();
    writeln!(out, "string SignalType = \"{}\";", kind).ok();
    writeln!(out).ok();
    writeln!(out, "input int    InpMagicNumber = 123456;   // Magic Number").ok();
    writeln!(out, "input double InpLotSize     = 0.10;     // Lot Size").ok();
    writeln!(out).ok();
    writeln!(out, "CTrade trade;").ok();
    writeln!(out, "bool   signalExecuted = false;").ok();
    writeln!(out).ok();
}

fn mql5_on_init(out: &mut String) {
    writeln!(out, "//+------------------------------------------------------------------+").ok();
    writeln!(out, "int OnInit()").ok();
    writeln!(out, "{{").ok();
    writeln!(out, "   trade.SetExpertMagicNumber(InpMagicNumber);").ok();
    writeln!(out, "   return(INIT_SUCCEEDED);").ok();
    writeln!(out, "}}").ok();
    writeln!(out).ok();
}

fn mql5_on_tick(out: &mut String) {
    writeln!(out, "//+------------------------------------------------------------------+").ok();
    writeln!(out, "void OnTick()").ok();
    writeln!(out, "{{").ok();
    writeln!(out, "   if(signalExecuted || EntryLevel <= 0.0)").ok();
    writeln!(out, "      return;").ok();
    writeln!(out).ok();
    writeln!(out, "   double ask = SymbolInfoDouble(_Symbol, SYMBOL_ASK);").ok();
    writeln!(out, "   double bid = SymbolInfoDouble(_Symbol, SYMBOL_BID);").ok();
    writeln!(out).ok();
    writeln!(out, "   if(SignalType == \"BUY\" && ask <= EntryLevel)").ok();
    writeln!(out, "   {{").ok();
    writeln!(out, "      signalExecuted = trade.Buy(InpLotSize, _Symbol, ask, SLLevel, TPLevel, \"SignalDesk BUY\");").ok();
    writeln!(out, "   }}").ok();
    writeln!(out, "   else if(SignalType == \"SELL\" && bid >= EntryLevel)").ok();
    writeln!(out, "   {{").ok();
    writeln!(out, "      signalExecuted = trade.Sell(InpLotSize, _Symbol, bid, SLLevel, TPLevel, \"SignalDesk SELL\");").ok();
    writeln!(out, "   }}").ok();
    writeln!(out, "}}").ok();
}

/// Price with the pair's precision; zero stays a bare `0`.
fn format_level(value: f64, digits: usize) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{:.*}", digits, value)
    }
}
